use std::{
    error::Error,
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::mpsc,
    thread,
};

use alarm_pool::{CommandParser, Config, Context, Coordinator, Notice};
use clap::{Parser, Subcommand};
use log::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// config file to use instead of the one in the user config directory
    #[clap(long, short)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write the default config file
    Init {
        #[clap(long, short)]
        force: bool,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    // initialize the logger
    simple_file_logger::init_logger!("alarm_pool").expect("couldn't initialize logger");

    let args = Args::parse();
    let path = match args.config {
        Some(path) => path,
        None => Config::config_path()?,
    };

    if let Some(Command::Init { force }) = args.command {
        if force || !path.exists() {
            Config::new().save(&path)?;
            println!("wrote default config to {}", path.display());
        } else {
            println!(
                "config already exists at {}, use --force to overwrite it",
                path.display()
            );
        }
        return Ok(());
    }

    let config = Config::load_or_default(&path)?;
    config.validate()?;

    // printer thread, every status line goes through here so lines from
    // different display threads never interleave
    let (tx, rx) = mpsc::channel::<Notice>();
    let time_format = config.time_format.clone();
    thread::spawn(move || {
        for notice in rx {
            println!("{}", notice.render(&time_format));
        }
    });

    let coordinator = Coordinator::new(Context::new(config.timing(), tx));
    let parser = CommandParser::new()?;
    info!("alarm pool started");
    run_repl(&coordinator, &parser, &config.prompt)
}

fn run_repl(
    coordinator: &Coordinator,
    parser: &CommandParser,
    prompt: &str,
) -> Result<(), Box<dyn Error>> {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{prompt}");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            info!("end of input, exiting");
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }
        let command = match parser.parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if let Err(e) = coordinator.execute(command) {
            if e.is_fatal() {
                error!("{e}");
                return Err(e.into());
            }
            println!("{e}");
        }
    }
}

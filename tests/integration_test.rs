//! Integration tests for the alarm pool
//!
//! These drive a real coordinator with real display threads and watch the
//! notices they print.

use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use alarm_pool::{
    AlarmError, AlarmStatus, Command, CommandParser, Context, Coordinator, Notice, Timing,
};

fn setup() -> (Coordinator, Receiver<Notice>) {
    let (tx, rx) = mpsc::channel();
    let timing = Timing {
        heartbeat: Duration::from_millis(200),
        wake_slack: Duration::from_millis(10),
        event_ttl: Duration::from_secs(5),
    };
    (Coordinator::new(Context::new(timing, tx)), rx)
}

fn start(id: u32, secs: u32, message: &str) -> Command {
    Command::StartAlarm {
        id,
        duration_secs: secs,
        message: message.to_string(),
    }
}

/// Collects notices until one matches, panics when none shows up in time.
fn wait_for(
    rx: &Receiver<Notice>,
    timeout: Duration,
    mut matches: impl FnMut(&Notice) -> bool,
) -> Vec<Notice> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(notice) => {
                let done = matches(&notice);
                seen.push(notice);
                if done {
                    return seen;
                }
            }
            Err(_) => panic!("expected notice never arrived, saw {seen:#?}"),
        }
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_alarm_expires_and_worker_retires() {
    let (coordinator, rx) = setup();
    coordinator.execute(start(1, 1, "hello")).unwrap();
    {
        let registry = coordinator.context().lock_registry();
        let alarm = registry.find(1).unwrap();
        assert_eq!(alarm.duration_secs(), 1);
        assert_eq!(alarm.status, AlarmStatus::Active);
    }
    assert_eq!(coordinator.context().lock_pool().len(), 1);

    let seen = wait_for(&rx, Duration::from_secs(5), |n| {
        matches!(n, Notice::Expired { alarm: 1, .. })
    });
    assert!(matches!(seen[0], Notice::Inserted { alarm: 1, .. }));
    assert!(matches!(seen[1], Notice::WorkerCreated { alarm: 1, .. }));

    wait_for(&rx, Duration::from_secs(2), |n| {
        matches!(n, Notice::WorkerExited { .. })
    });
    assert!(!coordinator.context().lock_registry().exists(1));
    assert!(coordinator.context().lock_pool().is_empty());
}

#[test]
fn test_second_alarm_shares_worker() {
    let (coordinator, rx) = setup();
    coordinator.execute(start(1, 30, "first")).unwrap();
    coordinator.execute(start(2, 30, "hi")).unwrap();

    let seen = wait_for(&rx, Duration::from_secs(2), |n| {
        matches!(n, Notice::Assigned { alarm: 2, .. })
    });
    let created = seen
        .iter()
        .find_map(|n| match n {
            Notice::WorkerCreated { worker, .. } => Some(*worker),
            _ => None,
        })
        .unwrap();
    assert!(matches!(
        seen.last(),
        Some(Notice::Assigned { worker, .. }) if *worker == created
    ));
    {
        let pool = coordinator.context().lock_pool();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.held(created), Some(2));
        assert!(pool.is_full());
    }

    // the only worker is full now, a third alarm gets a thread of its own
    coordinator.execute(start(3, 30, "third")).unwrap();
    wait_for(&rx, Duration::from_secs(2), |n| {
        matches!(n, Notice::WorkerCreated { alarm: 3, .. })
    });
    assert_eq!(coordinator.context().lock_pool().len(), 2);
}

#[test]
fn test_duplicate_start_keeps_first() {
    let (coordinator, _rx) = setup();
    coordinator.execute(start(3, 100, "x")).unwrap();
    let err = coordinator.execute(start(3, 50, "y")).unwrap_err();
    assert!(matches!(err, AlarmError::DuplicateId(3)));
    let registry = coordinator.context().lock_registry();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.find(3).unwrap().duration_secs(), 100);
}

#[test]
fn test_cancel_unknown_changes_nothing() {
    let (coordinator, _rx) = setup();
    let err = coordinator.execute(Command::CancelAlarm(1)).unwrap_err();
    assert!(err.to_string().contains("not a valid ID"));
    assert!(coordinator.context().lock_registry().is_empty());
    assert!(coordinator.context().lock_mailbox().is_empty());
    assert!(coordinator.context().lock_pool().is_empty());
}

// =============================================================================
// Events
// =============================================================================

#[test]
fn test_suspend_then_reactivate() {
    let (coordinator, rx) = setup();
    coordinator.execute(start(5, 30, "nap")).unwrap();
    wait_for(&rx, Duration::from_secs(2), |n| {
        matches!(n, Notice::Heartbeat { alarm: 5, .. })
    });

    coordinator.execute(Command::SuspendAlarm(5)).unwrap();
    wait_for(&rx, Duration::from_secs(2), |n| {
        matches!(n, Notice::Suspended { alarm: 5, .. })
    });
    assert_eq!(
        coordinator.context().lock_registry().find(5).unwrap().status,
        AlarmStatus::Suspended
    );

    // a few heartbeat periods without any line for the suspended alarm
    std::thread::sleep(Duration::from_millis(700));
    assert!(!rx
        .try_iter()
        .any(|n| matches!(n, Notice::Heartbeat { alarm: 5, .. })));

    coordinator.execute(Command::ReactivateAlarm(5)).unwrap();
    assert_eq!(
        coordinator.context().lock_registry().find(5).unwrap().status,
        AlarmStatus::Active
    );
    let seen = wait_for(&rx, Duration::from_secs(2), |n| {
        matches!(n, Notice::Heartbeat { alarm: 5, .. })
    });
    assert!(matches!(seen[0], Notice::Reactivated { alarm: 5, .. }));
}

#[test]
fn test_cancel_releases_slot() {
    let (coordinator, rx) = setup();
    coordinator.execute(start(7, 30, "bye")).unwrap();
    coordinator.execute(Command::CancelAlarm(7)).unwrap();
    assert!(!coordinator.context().lock_registry().exists(7));

    wait_for(&rx, Duration::from_secs(2), |n| {
        matches!(n, Notice::Cancelled { alarm: 7, .. })
    });
    wait_for(&rx, Duration::from_secs(2), |n| {
        matches!(n, Notice::WorkerExited { .. })
    });
    assert!(coordinator.context().lock_pool().is_empty());
    assert!(coordinator.context().lock_mailbox().is_empty());
}

#[test]
fn test_change_shortens_from_creation_time() {
    let (coordinator, rx) = setup();
    coordinator.execute(start(8, 60, "long")).unwrap();
    coordinator
        .execute(Command::ChangeAlarm {
            id: 8,
            duration_secs: 1,
            message: "short".to_string(),
        })
        .unwrap();
    let seen = wait_for(&rx, Duration::from_secs(5), |n| {
        matches!(n, Notice::Expired { alarm: 8, .. })
    });
    assert!(matches!(
        seen.last(),
        Some(Notice::Expired { message, .. }) if message == "short"
    ));
}

#[test]
fn test_view_lists_every_worker_once() {
    let (coordinator, rx) = setup();
    coordinator.execute(start(1, 30, "a")).unwrap();
    coordinator.execute(start(2, 30, "b")).unwrap();
    coordinator.execute(start(3, 30, "c")).unwrap();
    wait_for(&rx, Duration::from_secs(2), |n| {
        matches!(n, Notice::WorkerCreated { alarm: 3, .. })
    });
    // make sure alarm 2 has been claimed before listing
    while !coordinator.context().lock_mailbox().is_empty() {
        std::thread::sleep(Duration::from_millis(10));
    }

    coordinator.execute(Command::ViewAlarms).unwrap();
    let mut listed = Vec::new();
    let mut listings = 0;
    while listings < 2 {
        let seen = wait_for(&rx, Duration::from_secs(2), |n| {
            matches!(n, Notice::Listing { .. })
        });
        if let Some(Notice::Listing { alarms, .. }) = seen.last() {
            listed.extend(alarms.iter().map(|alarm| alarm.id));
        }
        listings += 1;
    }
    listed.sort_unstable();
    assert_eq!(listed, vec![1, 2, 3]);
    assert!(coordinator.context().lock_mailbox().is_empty());
}

#[test]
fn test_parsed_commands_drive_coordinator() {
    let (coordinator, rx) = setup();
    let parser = CommandParser::new().unwrap();
    coordinator
        .execute(parser.parse("Start_Alarm(42): 30 tea is ready\n").unwrap())
        .unwrap();
    let seen = wait_for(&rx, Duration::from_secs(2), |n| {
        matches!(n, Notice::Inserted { .. })
    });
    assert!(matches!(
        &seen[0],
        Notice::Inserted { alarm: 42, message, .. } if message == "tea is ready"
    ));
    let err = coordinator
        .execute(parser.parse("Suspend_Alarm(41)").unwrap())
        .unwrap_err();
    assert!(matches!(err, AlarmError::NotFound(41)));
}

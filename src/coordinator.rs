//! The main thread side: turns commands into changes to the alarm list and
//! tells the display threads about them.

use std::{
    sync::{mpsc::Sender, Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use chrono::Local;
use log::debug;

use crate::{
    alarm::Alarm,
    command::Command,
    communication::{Event, Mailbox, Notice},
    config::Timing,
    error::AlarmError,
    pool::WorkerPool,
    registry::AlarmRegistry,
};

/// Everything the main thread and the display threads share.
///
/// Locks are always taken in the order registry, mailbox, pool. A poisoned
/// lock is taken over as is, a display thread that panicked must not stop
/// the rest from working.
#[derive(Debug)]
pub struct Context {
    registry: Mutex<AlarmRegistry>,
    alarm_changed: Condvar,
    mailbox: Mutex<Mailbox>,
    pool: Mutex<WorkerPool>,
    timing: Timing,
    notices: Sender<Notice>,
}

impl Context {
    #[must_use]
    pub fn new(timing: Timing, notices: Sender<Notice>) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(AlarmRegistry::new()),
            alarm_changed: Condvar::new(),
            mailbox: Mutex::new(Mailbox::new()),
            pool: Mutex::new(WorkerPool::new()),
            timing,
            notices,
        })
    }

    pub fn lock_registry(&self) -> MutexGuard<'_, AlarmRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lock_mailbox(&self) -> MutexGuard<'_, Mailbox> {
        self.mailbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lock_pool(&self) -> MutexGuard<'_, WorkerPool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub const fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Parks on the alarm condition variable for at most `timeout`,
    /// returns the guard and whether the wait timed out.
    pub(crate) fn wait_for_change<'a>(
        &'a self,
        registry: MutexGuard<'a, AlarmRegistry>,
        timeout: Duration,
    ) -> (MutexGuard<'a, AlarmRegistry>, bool) {
        let (registry, result) = self
            .alarm_changed
            .wait_timeout(registry, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        (registry, result.timed_out())
    }

    pub(crate) fn notify(&self, notice: Notice) {
        // nobody printing anymore means we are shutting down
        if self.notices.send(notice).is_err() {
            debug!("notice dropped, printer is gone");
        }
    }
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    ctx: Arc<Context>,
}

impl Coordinator {
    #[must_use]
    pub const fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub const fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Applies one command.
    ///
    /// The whole command runs under the registry lock and the display
    /// threads are woken once at the end, also when the command was
    /// rejected.
    pub fn execute(&self, command: Command) -> Result<(), AlarmError> {
        command.validate()?;
        debug!("executing {command:?}");
        let mut registry = self.ctx.lock_registry();
        let result = self.dispatch(&mut registry, command);
        self.ctx.alarm_changed.notify_all();
        drop(registry);
        if let Err(e) = &result {
            debug!("command rejected: {e}");
        }
        result
    }

    fn dispatch(&self, registry: &mut AlarmRegistry, command: Command) -> Result<(), AlarmError> {
        let now = Local::now();
        match command {
            Command::StartAlarm {
                id,
                duration_secs,
                message,
            } => {
                let inserted = Notice::Inserted {
                    alarm: id,
                    at: now,
                    duration_secs,
                    message: registry
                        .insert(Alarm::created_at(id, duration_secs, message, now))?
                        .message()
                        .to_string(),
                };
                let mut mailbox = self.ctx.lock_mailbox();
                let mut pool = self.ctx.lock_pool();
                // free slots may already be promised to starts nobody claimed yet
                if pool.is_full_with(mailbox.pending_starts()) {
                    // the new thread owns the alarm from the start, no event
                    let worker = match pool.spawn(&self.ctx, id) {
                        Ok(worker) => worker,
                        Err(e) => {
                            registry.remove(id)?;
                            return Err(e);
                        }
                    };
                    self.ctx.notify(inserted);
                    self.ctx.notify(Notice::WorkerCreated {
                        worker,
                        alarm: id,
                        at: Local::now(),
                    });
                } else {
                    drop(pool);
                    debug!("publishing start for alarm {id}");
                    mailbox.publish(Event::Start(id), Instant::now());
                    self.ctx.notify(inserted);
                }
            }
            Command::ChangeAlarm {
                id,
                duration_secs,
                message,
            } => {
                let alarm = registry.change(id, duration_secs, message)?;
                self.ctx.notify(Notice::Changed {
                    alarm: id,
                    at: now,
                    duration_secs,
                    message: alarm.message().to_string(),
                });
            }
            Command::CancelAlarm(id) => {
                registry.remove(id)?;
                // a suspend for an alarm that is gone has nothing left to do
                let mut mailbox = self.ctx.lock_mailbox();
                mailbox.withdraw(Event::Suspend(id));
                if mailbox.withdraw(Event::Start(id)) {
                    // no display thread holds it yet, nobody to tell
                    debug!("alarm {id} cancelled before any display thread took it");
                } else {
                    debug!("publishing cancel for alarm {id}");
                    mailbox.publish(Event::Cancel(id), Instant::now());
                }
            }
            Command::SuspendAlarm(id) => {
                let mut mailbox = self.ctx.lock_mailbox();
                if !registry.find(id)?.is_active() || mailbox.contains(Event::Suspend(id)) {
                    return Err(AlarmError::AlreadySuspended(id));
                }
                debug!("publishing suspend for alarm {id}");
                mailbox.publish(Event::Suspend(id), Instant::now());
            }
            Command::ReactivateAlarm(id) => {
                registry.reactivate(id)?;
                // a suspend still waiting for its owner would undo this
                if self.ctx.lock_mailbox().withdraw(Event::Suspend(id)) {
                    debug!("withdrew pending suspend for alarm {id}");
                }
                self.ctx.notify(Notice::Reactivated { alarm: id, at: now });
            }
            Command::ViewAlarms => {
                let mut mailbox = self.ctx.lock_mailbox();
                let viewers = self.ctx.lock_pool().members();
                mailbox.publish_view(viewers, Instant::now());
            }
        }
        Ok(())
    }
}

//! Display threads.
//!
//! A display thread holds up to [`MAX_ALARMS_PER_WORKER`] alarm ids. It
//! sleeps on the alarm condition variable until either the next heartbeat,
//! the earliest expiration of its alarms, or a broadcast from the main
//! thread. Once it holds nothing it leaves the pool and the thread ends.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Local;
use log::{debug, warn};

use crate::{
    alarm::{Alarm, AlarmId},
    communication::{Event, Notice},
    coordinator::Context,
    pool::{WorkerId, MAX_ALARMS_PER_WORKER},
    registry::AlarmRegistry,
};

#[derive(Debug)]
pub struct DisplayWorker {
    id: WorkerId,
    slots: [Option<AlarmId>; MAX_ALARMS_PER_WORKER],
    ctx: Arc<Context>,
}

impl DisplayWorker {
    #[must_use]
    pub fn new(id: WorkerId, seed: Option<AlarmId>, ctx: Arc<Context>) -> Self {
        let mut slots = [None; MAX_ALARMS_PER_WORKER];
        slots[0] = seed;
        Self { id, slots, ctx }
    }

    #[must_use]
    pub const fn id(&self) -> WorkerId {
        self.id
    }

    /// number of occupied slots
    #[must_use]
    pub fn held(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    #[must_use]
    pub fn holds(&self, alarm: AlarmId) -> bool {
        self.slot_of(alarm).is_some()
    }

    fn slot_of(&self, alarm: AlarmId) -> Option<usize> {
        self.slots.iter().position(|slot| *slot == Some(alarm))
    }

    fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Runs until the worker holds no alarms, then leaves the pool.
    pub fn run(mut self) {
        debug!("display thread {} started", self.id);
        let ctx = Arc::clone(&self.ctx);
        let mut registry = ctx.lock_registry();
        loop {
            self.drain_events(&mut registry);
            if self.held() == 0 {
                self.retire();
                return;
            }
            let timeout = self.next_wake(&registry);
            let deadline = Instant::now().checked_add(timeout);
            let (guard, timed_out) = ctx.wait_for_change(registry, timeout);
            registry = guard;
            if timed_out || deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                // a cancel that came in together with the timeout goes first,
                // otherwise the expiry pass would find its alarm missing
                self.drain_events(&mut registry);
                self.on_timeout(&mut registry);
            }
        }
    }

    /// Time until the next wake up: the heartbeat, or the earliest expiry
    /// when that comes first, plus the slack so the expiry has really passed.
    fn next_wake(&self, registry: &AlarmRegistry) -> Duration {
        let timing = self.ctx.timing();
        let now = Local::now();
        let earliest = self
            .slots
            .iter()
            .flatten()
            .filter_map(|id| registry.find(*id).ok())
            .map(|alarm| {
                (alarm.expiration_time() - now)
                    .to_std()
                    .unwrap_or(Duration::ZERO)
            })
            .min();
        let wait = earliest.map_or(timing.heartbeat, |until| until.min(timing.heartbeat));
        wait.saturating_add(timing.wake_slack)
    }

    /// Expires due alarms and prints the active ones, slot by slot.
    fn on_timeout(&mut self, registry: &mut AlarmRegistry) {
        let now = Local::now();
        for slot in 0..self.slots.len() {
            let Some(id) = self.slots[slot] else {
                continue;
            };
            let Ok(alarm) = registry.find(id) else {
                // cancelled before we got to claim the cancel event
                debug!("display thread {} dropping missing alarm {id}", self.id);
                self.release(slot);
                continue;
            };
            if alarm.is_expired(now) {
                if let Ok(alarm) = registry.remove(id) {
                    self.ctx.notify(Notice::Expired {
                        worker: self.id,
                        alarm: id,
                        at: now,
                        message: alarm.message().to_string(),
                    });
                }
                self.release(slot);
            } else if alarm.is_active() {
                self.ctx.notify(Notice::Heartbeat {
                    worker: self.id,
                    alarm: id,
                    at: now,
                    duration_secs: alarm.duration_secs(),
                    message: alarm.message().to_string(),
                });
            }
        }
    }

    /// Claims and applies every pending event this worker may take.
    fn drain_events(&mut self, registry: &mut AlarmRegistry) {
        let ctx = Arc::clone(&self.ctx);
        let mut mailbox = ctx.lock_mailbox();
        for event in mailbox.purge_stale(Instant::now(), ctx.timing().event_ttl) {
            warn!("dropping {event:?}, no display thread claimed it");
        }
        loop {
            let claimed = mailbox.claim(self.id, |event| self.accepts(event, registry));
            let Some(event) = claimed else {
                break;
            };
            debug!("display thread {} claimed {event:?}", self.id);
            self.apply(event, registry);
        }
    }

    /// whether this worker is the one that should handle `event`
    fn accepts(&self, event: &Event, registry: &AlarmRegistry) -> bool {
        match *event {
            Event::Start(_) => self.free_slot().is_some(),
            Event::Suspend(id) => self.holds(id) && registry.find(id).is_ok_and(Alarm::is_active),
            Event::Cancel(id) => self.holds(id),
            Event::View => true,
        }
    }

    fn apply(&mut self, event: Event, registry: &mut AlarmRegistry) {
        let now = Local::now();
        match event {
            Event::Start(id) => {
                let Some(slot) = self.free_slot() else {
                    return;
                };
                self.slots[slot] = Some(id);
                self.sync_pool();
                self.ctx.notify(Notice::Assigned {
                    worker: self.id,
                    alarm: id,
                    at: now,
                });
            }
            Event::Suspend(id) => {
                if registry.suspend(id).is_ok() {
                    self.ctx.notify(Notice::Suspended {
                        worker: self.id,
                        alarm: id,
                        at: now,
                    });
                }
            }
            Event::Cancel(id) => {
                if let Some(slot) = self.slot_of(id) {
                    self.ctx.notify(Notice::Cancelled {
                        worker: self.id,
                        alarm: id,
                        at: now,
                    });
                    self.release(slot);
                }
            }
            Event::View => {
                let alarms = self
                    .slots
                    .iter()
                    .flatten()
                    .filter_map(|id| registry.find(*id).ok().cloned())
                    .collect();
                self.ctx.notify(Notice::Listing {
                    worker: self.id,
                    at: now,
                    alarms,
                });
            }
        }
    }

    fn release(&mut self, slot: usize) {
        self.slots[slot] = None;
        self.sync_pool();
    }

    fn sync_pool(&self) {
        self.ctx.lock_pool().set_held(self.id, self.held());
    }

    // caller still holds the registry lock
    fn retire(&self) {
        let mut mailbox = self.ctx.lock_mailbox();
        mailbox.forget_worker(self.id);
        self.ctx.lock_pool().remove(self.id);
        drop(mailbox);
        debug!("display thread {} exiting", self.id);
        self.ctx.notify(Notice::WorkerExited {
            worker: self.id,
            at: Local::now(),
        });
    }
}

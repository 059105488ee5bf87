//! Messages exchanged between the main thread and the display threads.
//!
//! [`Event`]s flow from the coordinator to the workers through the
//! [`Mailbox`], [`Notice`]s flow from everybody to the printer.

use std::{
    collections::{BTreeSet, VecDeque},
    fmt::Write as _,
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};

use crate::{
    alarm::{Alarm, AlarmId},
    pool::WorkerId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// a new alarm that needs a display thread with a free slot
    Start(AlarmId),
    Suspend(AlarmId),
    Cancel(AlarmId),
    /// every display thread lists the alarms it holds
    View,
}

impl Event {
    #[must_use]
    pub const fn alarm_id(&self) -> Option<AlarmId> {
        match self {
            Self::Start(id) | Self::Suspend(id) | Self::Cancel(id) => Some(*id),
            Self::View => None,
        }
    }
}

#[derive(Debug)]
struct Posted {
    event: Event,
    posted_at: Instant,
    // only used by `Event::View`, the workers that still have to print
    viewers: BTreeSet<WorkerId>,
}

/// Pending events, oldest first.
///
/// Publishing never replaces an event that has not been claimed yet.
/// `Start`, `Suspend` and `Cancel` are handed to exactly one worker, a `View`
/// is handed once to each worker that was in the pool when it was published.
#[derive(Debug, Default)]
pub struct Mailbox {
    pending: VecDeque<Posted>,
}

impl Mailbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// queues a single consumer event
    ///
    /// a `View` published here has nobody to show it to and is dropped,
    /// use [`Self::publish_view`] instead
    pub fn publish(&mut self, event: Event, now: Instant) {
        if event == Event::View {
            self.publish_view(BTreeSet::new(), now);
            return;
        }
        self.pending.push_back(Posted {
            event,
            posted_at: now,
            viewers: BTreeSet::new(),
        });
    }

    pub fn publish_view(&mut self, viewers: BTreeSet<WorkerId>, now: Instant) {
        if viewers.is_empty() {
            return;
        }
        self.pending.push_back(Posted {
            event: Event::View,
            posted_at: now,
            viewers,
        });
    }

    /// Hands the oldest event `worker` may take to it.
    ///
    /// `accepts` decides for `Start`, `Suspend` and `Cancel`, a `View` is
    /// offered to the workers it was published for. Events for the same alarm
    /// are claimed in the order they were published: one waiting behind an
    /// unclaimed event for its alarm is not offered yet. A claimed single
    /// consumer event leaves the mailbox, a `View` leaves once every viewer has
    /// seen it.
    pub fn claim(
        &mut self,
        worker: WorkerId,
        mut accepts: impl FnMut(&Event) -> bool,
    ) -> Option<Event> {
        let mut waiting = BTreeSet::new();
        let index = self.pending.iter().position(|posted| match posted.event {
            Event::View => posted.viewers.contains(&worker),
            ref event => {
                let Some(alarm) = event.alarm_id() else {
                    return false;
                };
                if waiting.contains(&alarm) {
                    return false;
                }
                // whoever takes this one goes first for its alarm
                waiting.insert(alarm);
                accepts(event)
            }
        })?;
        let posted = &mut self.pending[index];
        if posted.event == Event::View {
            posted.viewers.remove(&worker);
            if posted.viewers.is_empty() {
                self.pending.remove(index);
            }
            return Some(Event::View);
        }
        self.pending.remove(index).map(|posted| posted.event)
    }

    /// strikes a retiring worker from every pending `View`
    pub fn forget_worker(&mut self, worker: WorkerId) {
        self.pending.retain_mut(|posted| {
            if posted.event != Event::View {
                return true;
            }
            posted.viewers.remove(&worker);
            !posted.viewers.is_empty()
        });
    }

    /// takes back an event nobody claimed yet, returns whether it was there
    pub fn withdraw(&mut self, event: Event) -> bool {
        let before = self.pending.len();
        self.pending.retain(|posted| posted.event != event);
        self.pending.len() != before
    }

    /// Drops events nobody claimed within `ttl` and returns them.
    ///
    /// `Start` events are kept no matter how old, dropping one would leave
    /// its alarm without a display thread.
    pub fn purge_stale(&mut self, now: Instant, ttl: Duration) -> Vec<Event> {
        let mut stale = Vec::new();
        self.pending.retain(|posted| {
            let expired = !matches!(posted.event, Event::Start(_))
                && now.saturating_duration_since(posted.posted_at) >= ttl;
            if expired {
                stale.push(posted.event);
            }
            !expired
        });
        stale
    }

    /// `Start` events still waiting for a display thread
    #[must_use]
    pub fn pending_starts(&self) -> usize {
        self.iter()
            .filter(|event| matches!(event, Event::Start(_)))
            .count()
    }

    #[must_use]
    pub fn contains(&self, event: Event) -> bool {
        self.iter().any(|pending| *pending == event)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.pending.iter().map(|posted| &posted.event)
    }
}

/// A status line for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Inserted {
        alarm: AlarmId,
        at: DateTime<Local>,
        duration_secs: u32,
        message: String,
    },
    WorkerCreated {
        worker: WorkerId,
        alarm: AlarmId,
        at: DateTime<Local>,
    },
    Assigned {
        worker: WorkerId,
        alarm: AlarmId,
        at: DateTime<Local>,
    },
    Changed {
        alarm: AlarmId,
        at: DateTime<Local>,
        duration_secs: u32,
        message: String,
    },
    Expired {
        worker: WorkerId,
        alarm: AlarmId,
        at: DateTime<Local>,
        message: String,
    },
    Suspended {
        worker: WorkerId,
        alarm: AlarmId,
        at: DateTime<Local>,
    },
    Cancelled {
        worker: WorkerId,
        alarm: AlarmId,
        at: DateTime<Local>,
    },
    Reactivated {
        alarm: AlarmId,
        at: DateTime<Local>,
    },
    Heartbeat {
        worker: WorkerId,
        alarm: AlarmId,
        at: DateTime<Local>,
        duration_secs: u32,
        message: String,
    },
    Listing {
        worker: WorkerId,
        at: DateTime<Local>,
        alarms: Vec<Alarm>,
    },
    WorkerExited {
        worker: WorkerId,
        at: DateTime<Local>,
    },
}

impl Notice {
    /// formats the notice, `time_format` is a chrono strftime string
    #[must_use]
    pub fn render(&self, time_format: &str) -> String {
        let stamp = |at: &DateTime<Local>| at.format(time_format).to_string();
        match self {
            Self::Inserted {
                alarm,
                at,
                duration_secs,
                message,
            } => format!(
                "Alarm({alarm}) Inserted by Main Thread Into Alarm List at {}: {duration_secs} {message}",
                stamp(at)
            ),
            Self::WorkerCreated { worker, alarm, at } => format!(
                "New Display Alarm Thread {worker} Created for Alarm({alarm}) at {}",
                stamp(at)
            ),
            Self::Assigned { worker, alarm, at } => format!(
                "Alarm({alarm}) Assigned to Display Alarm Thread {worker} at {}",
                stamp(at)
            ),
            Self::Changed {
                alarm,
                at,
                duration_secs,
                message,
            } => format!(
                "Alarm({alarm}) Changed at {}: {duration_secs} {message}",
                stamp(at)
            ),
            Self::Expired {
                worker,
                alarm,
                at,
                message,
            } => format!(
                "Display Thread {worker} Removed Expired Alarm({alarm}) at {}: {message}",
                stamp(at)
            ),
            Self::Suspended { worker, alarm, at } => format!(
                "Alarm({alarm}) Suspended by Display Thread {worker} at {}",
                stamp(at)
            ),
            Self::Cancelled { worker, alarm, at } => format!(
                "Alarm({alarm}) Cancelled, Display Thread {worker} Stopped Printing It at {}",
                stamp(at)
            ),
            Self::Reactivated { alarm, at } => {
                format!("Alarm({alarm}) Reactivated at {}", stamp(at))
            }
            Self::Heartbeat {
                worker,
                alarm,
                at,
                duration_secs,
                message,
            } => format!(
                "Alarm({alarm}) Printed by Display Thread {worker} at {}: {duration_secs} {message}",
                stamp(at)
            ),
            Self::Listing { worker, at, alarms } => {
                let mut out = format!("Display Thread {worker} Alarms at {}:", stamp(at));
                if alarms.is_empty() {
                    out.push_str(" no alarms");
                }
                for alarm in alarms {
                    // writing into a String can't fail
                    let _ = write!(
                        out,
                        "\n  Alarm({}) Created at {}: {} {} [{}]",
                        alarm.id,
                        stamp(&alarm.creation_time()),
                        alarm.duration_secs(),
                        alarm.message(),
                        alarm.status
                    );
                }
                out
            }
            Self::WorkerExited { worker, at } => format!(
                "Display Thread {worker} Has No Alarms and Exited at {}",
                stamp(at)
            ),
        }
    }
}

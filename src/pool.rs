use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    thread,
};

use log::debug;

use crate::{
    alarm::AlarmId,
    coordinator::Context,
    error::AlarmError,
    worker::DisplayWorker,
};

pub type WorkerId = u32;

/// how many alarms a single display thread takes care of
pub const MAX_ALARMS_PER_WORKER: usize = 2;

/// Which display threads are alive and how many alarms each one holds.
///
/// The pool never looks at the alarms themselves, that is up to the worker.
#[derive(Debug, Default)]
pub struct WorkerPool {
    members: BTreeMap<WorkerId, usize>,
    next_id: WorkerId,
}

impl WorkerPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// true when no member has a free slot, an empty pool counts as full
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.is_full_with(0)
    }

    /// like [`Self::is_full`] with `reserved` free slots already promised to
    /// alarms that are waiting in the mailbox
    #[must_use]
    pub fn is_full_with(&self, reserved: usize) -> bool {
        self.free_slots() <= reserved
    }

    /// slots not taken by any member
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.members
            .values()
            .map(|&held| MAX_ALARMS_PER_WORKER.saturating_sub(held))
            .sum()
    }

    /// Starts a display thread that already owns `seed`.
    ///
    /// The caller holds the registry lock, so the new thread can't look at
    /// anything (or print anything) until the current command is done.
    pub fn spawn(&mut self, ctx: &Arc<Context>, seed: AlarmId) -> Result<WorkerId, AlarmError> {
        let id = self.join(1);
        let worker = DisplayWorker::new(id, Some(seed), Arc::clone(ctx));
        let spawned = thread::Builder::new()
            .name(format!("display-{id}"))
            .spawn(move || worker.run());
        if let Err(e) = spawned {
            self.remove(id);
            return Err(AlarmError::WorkerSpawn(e));
        }
        debug!("spawned display thread {id} for alarm {seed}");
        Ok(id)
    }

    /// adds a member holding `held` alarms and hands out its id
    pub fn join(&mut self, held: usize) -> WorkerId {
        self.next_id += 1;
        let id = self.next_id;
        debug_assert!(held <= MAX_ALARMS_PER_WORKER, "worker {id} joined holding {held}");
        self.members.insert(id, held);
        id
    }

    pub fn set_held(&mut self, worker: WorkerId, held: usize) {
        debug_assert!(held <= MAX_ALARMS_PER_WORKER, "worker {worker} holds {held}");
        if let Some(count) = self.members.get_mut(&worker) {
            *count = held;
        }
    }

    /// returns whether the worker was a member
    pub fn remove(&mut self, worker: WorkerId) -> bool {
        self.members.remove(&worker).is_some()
    }

    #[must_use]
    pub fn held(&self, worker: WorkerId) -> Option<usize> {
        self.members.get(&worker).copied()
    }

    #[must_use]
    pub fn members(&self) -> BTreeSet<WorkerId> {
        self.members.keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

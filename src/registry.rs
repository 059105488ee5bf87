use std::collections::{btree_map::Entry, BTreeMap};

use crate::{
    alarm::{Alarm, AlarmId, AlarmStatus, GetId},
    error::AlarmError,
};

/// The alarm list, kept sorted by id.
///
/// Workers only keep the id of the alarms they display, every read and write
/// goes through here so a change made by the main thread is seen by the
/// worker the next time it looks the alarm up.
///
/// None of these methods block, the caller is expected to hold the registry
/// lock from [`crate::coordinator::Context`].
#[derive(Debug, Default)]
pub struct AlarmRegistry {
    alarms: BTreeMap<AlarmId, Alarm>,
}

impl AlarmRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// adds the alarm in id order, an alarm with the same id is left alone
    pub fn insert(&mut self, alarm: Alarm) -> Result<&Alarm, AlarmError> {
        let id = *alarm.get_id();
        match self.alarms.entry(id) {
            Entry::Occupied(_) => Err(AlarmError::DuplicateId(id)),
            Entry::Vacant(slot) => Ok(&*slot.insert(alarm)),
        }
    }

    pub fn remove(&mut self, id: AlarmId) -> Result<Alarm, AlarmError> {
        self.alarms.remove(&id).ok_or(AlarmError::NotFound(id))
    }

    pub fn find(&self, id: AlarmId) -> Result<&Alarm, AlarmError> {
        self.alarms.get(&id).ok_or(AlarmError::NotFound(id))
    }

    #[must_use]
    pub fn exists(&self, id: AlarmId) -> bool {
        self.alarms.contains_key(&id)
    }

    /// changes duration and message in place, the creation time is kept
    pub fn change(
        &mut self,
        id: AlarmId,
        duration_secs: u32,
        message: String,
    ) -> Result<&Alarm, AlarmError> {
        let alarm = self.find_mut(id)?;
        alarm.change(duration_secs, message);
        Ok(&*alarm)
    }

    pub fn reactivate(&mut self, id: AlarmId) -> Result<&Alarm, AlarmError> {
        self.set_status(id, AlarmStatus::Active)
    }

    pub fn suspend(&mut self, id: AlarmId) -> Result<&Alarm, AlarmError> {
        self.set_status(id, AlarmStatus::Suspended)
    }

    fn set_status(&mut self, id: AlarmId, status: AlarmStatus) -> Result<&Alarm, AlarmError> {
        let alarm = self.find_mut(id)?;
        alarm.status = status;
        Ok(&*alarm)
    }

    fn find_mut(&mut self, id: AlarmId) -> Result<&mut Alarm, AlarmError> {
        self.alarms.get_mut(&id).ok_or(AlarmError::NotFound(id))
    }

    /// alarms in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Alarm> {
        self.alarms.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }
}

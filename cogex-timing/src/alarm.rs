use std::collections::BTreeMap;
use tracing::trace;

/// Handle of a scheduled alarm. Ids are never reused, so a stale handle can
/// not cancel a newer alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlarmId(u64);

/// One-shot, cancelable alarms ordered by deadline.
///
/// Nothing fires by itself: the owner polls [`Alarms::take_due`] whenever its
/// event loop wakes up, and uses [`Alarms::next_deadline`] to decide when
/// that should be.
#[derive(Debug)]
pub struct Alarms<K> {
    next_id: u64,
    pending: BTreeMap<(u64, AlarmId), K>,
}

impl<K> Default for Alarms<K> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: BTreeMap::new(),
        }
    }
}

impl<K> Alarms<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, kind: K, at_ns: u64) -> AlarmId {
        let id = AlarmId(self.next_id);
        self.next_id += 1;
        self.pending.insert((at_ns, id), kind);
        trace!(?id, at_ns, "alarm scheduled");
        id
    }

    /// Returns false if the alarm already fired or was cancelled.
    pub fn cancel(&mut self, id: AlarmId) -> bool {
        let key = self.pending.keys().find(|(_, k)| *k == id).copied();
        match key {
            Some(key) => {
                self.pending.remove(&key);
                trace!(?id, "alarm cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// When `id` is due, if it is still pending.
    pub fn deadline_of(&self, id: AlarmId) -> Option<u64> {
        self.pending
            .keys()
            .find(|(_, k)| *k == id)
            .map(|(at, _)| *at)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.keys().next().map(|(at, _)| *at)
    }

    /// Removes and returns every alarm whose deadline is at or before `now_ns`,
    /// earliest first.
    pub fn take_due(&mut self, now_ns: u64) -> Vec<(AlarmId, K)> {
        let later = self.pending.split_off(&(now_ns.saturating_add(1), AlarmId(0)));
        let due = std::mem::replace(&mut self.pending, later);
        due.into_iter().map(|((_, id), kind)| (id, kind)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_alarms_come_out_in_deadline_order() {
        let mut alarms = Alarms::new();
        alarms.schedule("late", 300);
        alarms.schedule("early", 100);
        alarms.schedule("never", 1_000);

        let due: Vec<_> = alarms.take_due(300).into_iter().map(|(_, k)| k).collect();
        assert_eq!(due, vec!["early", "late"]);
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms.next_deadline(), Some(1_000));
    }

    #[test]
    fn cancelled_alarm_never_fires() {
        let mut alarms = Alarms::new();
        let id = alarms.schedule((), 50);
        assert!(alarms.cancel(id));
        assert!(!alarms.cancel(id));
        assert!(alarms.take_due(u64::MAX).is_empty());
    }

    #[test]
    fn fired_alarm_cannot_be_cancelled() {
        let mut alarms = Alarms::new();
        let id = alarms.schedule(1, 10);
        assert_eq!(alarms.take_due(10).len(), 1);
        assert_eq!(alarms.deadline_of(id), None);
        assert!(!alarms.cancel(id));
    }

    #[test]
    fn ids_are_not_reused() {
        let mut alarms = Alarms::new();
        let first = alarms.schedule(0, 10);
        alarms.cancel(first);
        let second = alarms.schedule(0, 10);
        assert_ne!(first, second);
        assert!(!alarms.cancel(first));
        assert_eq!(alarms.deadline_of(second), Some(10));
    }

    #[test]
    fn cancel_all_empties() {
        let mut alarms = Alarms::new();
        alarms.schedule('a', 1);
        alarms.schedule('b', 2);
        assert_eq!(alarms.cancel_all(), 2);
        assert!(alarms.is_empty());
        assert_eq!(alarms.next_deadline(), None);
    }
}

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub time: DateTime<Utc>,
    pub pin_id: i64,
}

/// Min-queue of pin wake-ups, ordered by (time, pin id). Each pin has at
/// most one pending event; rescheduling replaces it.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<Event>,
}

impl EventQueue {
    pub fn new() -> EventQueue {
        EventQueue::default()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn contains(&self, pin_id: i64) -> bool {
        self.events.iter().any(|e| e.pin_id == pin_id)
    }

    pub fn peek(&self) -> Option<&Event> {
        self.events.first()
    }

    pub fn pop_front(&mut self) -> Option<Event> {
        if self.events.is_empty() {
            None
        } else {
            Some(self.events.remove(0))
        }
    }

    /// Inserts an event for `pin_id`, replacing any pending one at a
    /// different time.
    pub fn upsert(&mut self, pin_id: i64, time: DateTime<Utc>) {
        if let Some(existing) = self.events.iter().position(|e| e.pin_id == pin_id) {
            if self.events[existing].time == time {
                return;
            }
            self.events.remove(existing);
        }
        self.events.push(Event { time, pin_id });
        self.events.sort_by_key(|e| (e.time, e.pin_id));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ts(seconds: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(seconds, 0).unwrap()
    }

    #[test]
    fn test_ordering_and_tie_break() {
        let mut queue = EventQueue::new();
        queue.upsert(5, ts(100));
        queue.upsert(3, ts(50));
        queue.upsert(4, ts(50));
        assert_eq!(queue.pop_front(), Some(Event { time: ts(50), pin_id: 3 }));
        assert_eq!(queue.pop_front(), Some(Event { time: ts(50), pin_id: 4 }));
        assert_eq!(queue.pop_front(), Some(Event { time: ts(100), pin_id: 5 }));
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn test_one_event_per_pin() {
        let mut queue = EventQueue::new();
        queue.upsert(1, ts(100));
        queue.upsert(1, ts(40));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop_front(), Some(Event { time: ts(40), pin_id: 1 }));
    }

    #[test]
    fn test_same_time_upsert_is_noop() {
        let mut queue = EventQueue::new();
        queue.upsert(1, ts(100));
        queue.upsert(1, ts(100));
        assert_eq!(queue.len(), 1);
    }
}

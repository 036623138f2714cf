//! Timing queue
//!
//! Peripherals that need to do something "later" post a `TimedEvent` with a delay in CPU
//! cycles. The CPU core collaborator drives the queue through `run` as it executes: every event
//! whose date has been reached fires in date order, events scheduled for the same date fire in
//! the order they were posted. There is no way to cancel an event, handlers must check that the
//! state that scheduled them is still current.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::{ssp, CycleCount, Soc};

/// Everything that can be scheduled, along with the data the handler needs to validate it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimedEvent {
    /// An SSP word finished shifting. `generation` is the SSP transfer generation at the moment
    /// the event was posted.
    SspTransferComplete { generation: u32 },
}

#[derive(Debug, PartialEq, Eq)]
struct Scheduled {
    date: CycleCount,
    /// Posting order, breaks ties between events scheduled for the same date
    seq: u64,
    event: TimedEvent,
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Scheduled) -> Ordering {
        (self.date, self.seq).cmp(&(other.date, other.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Scheduled) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct TimingQueue {
    /// Current date, in CPU cycles since reset
    now: CycleCount,
    next_seq: u64,
    events: BinaryHeap<Reverse<Scheduled>>,
}

impl TimingQueue {
    pub fn new() -> TimingQueue {
        TimingQueue {
            now: 0,
            next_seq: 0,
            events: BinaryHeap::new(),
        }
    }

    pub fn now(&self) -> CycleCount {
        self.now
    }

    /// Post `event` to fire `delay` cycles from now
    pub fn schedule(&mut self, delay: CycleCount, event: TimedEvent) {
        let date = self.now.saturating_add(delay);

        trace!("Scheduling {:?} at {}", event, date);

        self.events.push(Reverse(Scheduled {
            date,
            seq: self.next_seq,
            event,
        }));

        self.next_seq += 1;
    }

    /// Date of the earliest pending event, if any
    pub fn next_event_date(&self) -> Option<CycleCount> {
        self.events.peek().map(|Reverse(s)| s.date)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every pending event and rewind the clock
    pub fn clear(&mut self) {
        self.events.clear();
        self.now = 0;
        self.next_seq = 0;
    }

    /// Pop the earliest event if it's due at or before `date`
    fn pop_due(&mut self, date: CycleCount) -> Option<(CycleCount, TimedEvent)> {
        match self.next_event_date() {
            Some(d) if d <= date => self.events.pop().map(|Reverse(s)| (s.date, s.event)),
            _ => None,
        }
    }
}

impl Default for TimingQueue {
    fn default() -> TimingQueue {
        TimingQueue::new()
    }
}

/// Advance emulated time by `cycles`, running every event that becomes due. Handlers run with
/// the clock set to their own date so that anything they schedule is relative to it. Events
/// posted by a handler that fall within the window run in the same call.
pub fn run(soc: &mut Soc, cycles: CycleCount) {
    let target = soc.timing.now.saturating_add(cycles);

    while let Some((date, event)) = soc.timing.pop_due(target) {
        soc.timing.now = date;

        dispatch(soc, event);
    }

    soc.timing.now = target;
}

fn dispatch(soc: &mut Soc, event: TimedEvent) {
    match event {
        TimedEvent::SspTransferComplete { generation } => ssp::transfer_complete(soc, generation),
    }
}

#[test]
fn events_fire_in_date_then_posting_order() {
    let mut queue = TimingQueue::new();

    queue.schedule(20, TimedEvent::SspTransferComplete { generation: 2 });
    queue.schedule(10, TimedEvent::SspTransferComplete { generation: 0 });
    queue.schedule(10, TimedEvent::SspTransferComplete { generation: 1 });

    assert_eq!(queue.next_event_date(), Some(10));
    assert_eq!(queue.pop_due(9), None);

    let mut fired = Vec::new();
    while let Some((date, TimedEvent::SspTransferComplete { generation })) = queue.pop_due(100) {
        fired.push((date, generation));
    }

    assert_eq!(fired, vec![(10, 0), (10, 1), (20, 2)]);
    assert!(queue.is_empty());
}

#[test]
fn clock_saturates_instead_of_wrapping() {
    let (mut soc, _, _) = super::test_util::soc_with_doubles();

    soc.run(10);
    soc.run(CycleCount::MAX);
    assert_eq!(soc.now(), CycleCount::MAX);

    // Anything posted past the end of time fires at the last representable date
    soc.timing.schedule(10, TimedEvent::SspTransferComplete { generation: 0 });
    assert_eq!(soc.timing.next_event_date(), Some(CycleCount::MAX));

    soc.run(1);
    assert!(soc.timing.is_empty());
    assert_eq!(soc.now(), CycleCount::MAX);
}

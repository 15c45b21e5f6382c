//! Structured run traces.
//!
//! The simulator records every observable scheduling and protocol event,
//! including a priority snapshot at the start of each tick. Scenario tests
//! assert against the trace; the demo binary prints it.
use priolock_kernel::{LockId, Priority, TaskId, Tick};

/// One observable event of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A task reached its release point and was started at its baseline
    /// priority.
    Released {
        tick: Tick,
        task: TaskId,
        priority: Priority,
    },
    /// Start-of-tick state: every task's current priority (in identity
    /// order) and the selected task, if any was eligible.
    Tick {
        tick: Tick,
        priorities: Vec<Priority>,
        active: Option<TaskId>,
    },
    /// A lock request was granted.
    Acquired {
        tick: Tick,
        task: TaskId,
        lock: LockId,
    },
    /// A lock request suspended the caller; `donated` is set when it also
    /// raised a holder's priority. `lock` is the lock that was requested,
    /// not necessarily the one absorbing the suspension.
    Suspended {
        tick: Tick,
        task: TaskId,
        lock: LockId,
        donated: bool,
    },
    /// A lock request was denied without suspension; the caller retries when
    /// next scheduled.
    Contended {
        tick: Tick,
        task: TaskId,
        lock: LockId,
    },
    /// A lock was released, draining `restored` donation records.
    Unlocked {
        tick: Tick,
        task: TaskId,
        lock: LockId,
        restored: usize,
    },
    /// A task ran its terminal step.
    Exited { tick: Tick, task: TaskId },
}

/// The event log of one simulator run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    events: Vec<Event>,
}

impl Trace {
    pub(crate) fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The priority snapshot recorded at the start of the given tick.
    pub fn snapshot_at(&self, tick: Tick) -> Option<&[Priority]> {
        self.events.iter().find_map(|event| match event {
            Event::Tick {
                tick: t,
                priorities,
                ..
            } if *t == tick => Some(priorities.as_slice()),
            _ => None,
        })
    }

    /// The task selected at the start of the given tick (`None` if the tick
    /// was idle or never reached).
    pub fn active_at(&self, tick: Tick) -> Option<TaskId> {
        self.events.iter().find_map(|event| match event {
            Event::Tick {
                tick: t, active, ..
            } if *t == tick => *active,
            _ => None,
        })
    }
}

//! Static system configuration.
//!
//! Everything here is plain data, assembled by the caller before the
//! scheduler starts and never mutated afterwards. Ceiling values are
//! supplied, not computed: determining the highest-priority user of each
//! lock is the caller's offline analysis.
use crate::{mutex::Protocol, sched::Tick, task::Priority};

/// Per-task configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskCfg {
    /// The priority assigned when the task is released.
    pub priority: Priority,
    /// The tick at which the task is released and its thread of control
    /// started.
    pub release_at: Tick,
}

impl TaskCfg {
    pub fn new(priority: Priority, release_at: Tick) -> Self {
        Self {
            priority,
            release_at,
        }
    }
}

/// Per-lock configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockCfg {
    pub protocol: Protocol,
    /// Ceiling variant: the precomputed maximum priority of any task
    /// statically known to ever acquire the lock. Inheritance variant: the
    /// initial floor, normally neutral.
    pub ceiling: Priority,
}

impl LockCfg {
    /// A priority-inheritance lock. The floor starts neutral and tracks
    /// requesters at runtime.
    pub fn inheritance() -> Self {
        Self {
            protocol: Protocol::Inheritance,
            ceiling: Priority::SUSPENDED,
        }
    }

    /// A priority-ceiling lock with the given static ceiling.
    pub fn ceiling(ceiling: Priority) -> Self {
        Self {
            protocol: Protocol::Ceiling,
            ceiling,
        }
    }
}

/// A whole system: the task set, the lock set, and the run length.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemCfg {
    pub tasks: Vec<TaskCfg>,
    pub locks: Vec<LockCfg>,
    /// Total number of ticks to run before stopping.
    pub budget: Tick,
}

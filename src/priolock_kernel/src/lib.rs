//! Priority-aware mutual exclusion for a cooperative fixed-priority task set.
//!
//! This crate implements two classical priority-inversion-avoidance
//! protocols as locking policies over a shared [`PriorityTable`]:
//!
//!  - **Priority inheritance** ([`Protocol::Inheritance`]): a lock holder's
//!    priority is temporarily raised to that of the highest-priority task
//!    blocked on the lock.
//!  - **Priority ceiling** ([`Protocol::Ceiling`]): every lock carries the
//!    priority of the highest-priority task that can ever use it, and a task
//!    may only acquire a free lock if its priority exceeds the ceilings of
//!    all locks currently held anywhere, bounding blocking chains.
//!
//! Every priority change either protocol makes is recorded in a per-lock
//! [`DonationHistory`] and undone, in strict LIFO order, by the matching
//! unlock. The crate also provides the cooperative scheduling policy
//! ([`Scheduler`]) that decides which task runs on each tick; actually
//! running tasks on threads is the job of a hosting environment such as
//! `priolock_sim`.
//!
//! The crate performs no I/O and no blocking. Callers are expected to
//! serialize access to the table, the registry, and the scheduler; in the
//! simulator they all live behind one lock.

pub mod cfg;
mod donation;
mod error;
mod mutex;
mod sched;
mod task;

pub use crate::{
    donation::{DonationHistory, DonationRecord},
    error::{LockError, RawMutexFault, UnlockError},
    mutex::{FlagMutex, Lock, LockId, LockRegistry, LockStatus, Protocol, RawMutex},
    sched::{Scheduler, Tick},
    task::{Priority, PriorityTable, TaskId, MAX_TASKS},
};

//! Error types.
//!
//! Contention is never an error: a denied acquisition is reported through
//! [`LockStatus`](crate::LockStatus). The enums here cover protocol misuse
//! and states from which no recovery is defined; a caller receiving one is
//! expected to halt rather than continue with a possibly corrupted priority
//! table.

/// Failure reported by the underlying mutual-exclusion primitive for any
/// outcome other than "acquired" or "already locked" (invalid state,
/// resource exhaustion). Always fatal to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMutexFault;

/// Error type for [`LockRegistry::lock`](crate::LockRegistry::lock).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// The caller already owns the lock (or, in the ceiling variant, would
    /// have to wait on a lock it owns itself). Recursive acquisition is not
    /// supported; granting it would deadlock.
    WouldDeadlock,
    /// The lock's ownership bookkeeping no longer matches the underlying
    /// primitive.
    BadObjectState,
    /// The underlying primitive failed.
    Fault,
}

/// Error type for [`LockRegistry::unlock`](crate::LockRegistry::unlock).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockError {
    /// The calling task does not own the lock.
    NotOwner,
    /// The donation history is inconsistent with the ownership state (an
    /// owned lock must at least hold its owner's acquisition record).
    BadObjectState,
    /// The underlying primitive failed.
    Fault,
}

impl From<RawMutexFault> for LockError {
    fn from(RawMutexFault: RawMutexFault) -> Self {
        Self::Fault
    }
}

impl From<RawMutexFault> for UnlockError {
    fn from(RawMutexFault: RawMutexFault) -> Self {
        Self::Fault
    }
}

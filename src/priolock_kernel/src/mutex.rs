//! Priority-aware locks.
//!
//! Both protocol variants share one data shape (owner, ceiling/floor
//! priority, donation history, underlying raw primitive) and differ only in
//! their admission rules. The ceiling variant's admission rule needs a view
//! of every lock in the system, so locks live in a [`LockRegistry`] and all
//! operations go through it.
use core::fmt;

use crate::{
    cfg::LockCfg,
    donation::{DonationHistory, DonationRecord},
    error::{LockError, RawMutexFault, UnlockError},
    task::{Priority, PriorityTable, TaskId},
};

/// Identifies a lock within its [`LockRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockId(usize);

impl LockId {
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock{}", self.0)
    }
}

/// Interface to the underlying mutual-exclusion primitive.
///
/// `Ok(false)` from [`try_lock`](Self::try_lock) ("already locked") is an
/// expected control-flow branch that drives donation and suspension. Any
/// [`RawMutexFault`] is fatal: the protocols abort rather than continue with
/// ownership bookkeeping that may no longer match the primitive.
pub trait RawMutex {
    /// Attempt a non-blocking acquisition. `Ok(true)` means acquired,
    /// `Ok(false)` means the primitive is already locked.
    fn try_lock(&mut self) -> Result<bool, RawMutexFault>;

    /// Release the primitive.
    fn unlock(&mut self) -> Result<(), RawMutexFault>;
}

/// The default raw primitive: a plain flag.
///
/// The hosting environment serializes all protocol calls behind one lock,
/// so a flag faithfully implements the try-lock contract. Releasing an
/// unlocked flag reports a fault, matching a real primitive's "invalid
/// state" outcome.
#[derive(Debug, Default)]
pub struct FlagMutex {
    locked: bool,
}

impl RawMutex for FlagMutex {
    fn try_lock(&mut self) -> Result<bool, RawMutexFault> {
        if self.locked {
            Ok(false)
        } else {
            self.locked = true;
            Ok(true)
        }
    }

    fn unlock(&mut self) -> Result<(), RawMutexFault> {
        if self.locked {
            self.locked = false;
            Ok(())
        } else {
            Err(RawMutexFault)
        }
    }
}

/// Which inversion-avoidance protocol a lock follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Priority inheritance: the holder inherits the priority of the
    /// highest-priority contender.
    Inheritance,
    /// Priority ceiling: admission is gated on the ceilings of every held
    /// lock in the system.
    Ceiling,
}

/// Successful outcome of a lock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// The caller now owns the lock.
    Acquired,
    /// The request was denied and the caller was suspended (priority zeroed)
    /// until the unlock that drains its record restores it. `donated` is set
    /// when the request also raised a holder's priority.
    Suspended {
        donated: bool,
    },
    /// The request was denied without suspension (inheritance variant only:
    /// the caller's priority does not exceed the floor). The caller stays
    /// ready and is expected to retry when next scheduled; no wait queue
    /// exists beyond the scheduler's own priority-driven selection.
    Contended,
}

/// One priority-aware lock. State is only mutated through the registry.
#[derive(Debug)]
pub struct Lock<M> {
    id: LockId,
    protocol: Protocol,
    /// Ceiling variant: the static ceiling from configuration. Inheritance
    /// variant: the dynamic floor, i.e. the highest priority requested while
    /// held, reset to neutral on full unlock. Never decreases while held.
    ceiling: Priority,
    owner: Option<TaskId>,
    history: DonationHistory,
    raw: M,
}

impl<M> Lock<M> {
    fn new(id: LockId, cfg: LockCfg, raw: M) -> Self {
        Self {
            id,
            protocol: cfg.protocol,
            ceiling: cfg.ceiling,
            owner: None,
            history: DonationHistory::new(),
            raw,
        }
    }

    pub fn id(&self) -> LockId {
        self.id
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The current ceiling (static) or floor (dynamic) priority.
    pub fn ceiling(&self) -> Priority {
        self.ceiling
    }

    pub fn owner(&self) -> Option<TaskId> {
        self.owner
    }

    pub fn is_locked(&self) -> bool {
        self.owner.is_some()
    }

    /// Donation records accumulated since the last full unlock.
    pub fn history_depth(&self) -> usize {
        self.history.len()
    }
}

/// All the locks of one system.
#[derive(Debug)]
pub struct LockRegistry<M = FlagMutex> {
    locks: Vec<Lock<M>>,
}

impl LockRegistry<FlagMutex> {
    /// Build a registry from configuration, one [`FlagMutex`] per lock.
    pub fn new(cfgs: &[LockCfg]) -> Self {
        Self::with_raw_mutexes(cfgs, |_| FlagMutex::default())
    }
}

impl<M: RawMutex> LockRegistry<M> {
    /// Build a registry with caller-supplied raw primitives (used by tests
    /// to inject faulting primitives).
    pub fn with_raw_mutexes(cfgs: &[LockCfg], mut make: impl FnMut(LockId) -> M) -> Self {
        Self {
            locks: cfgs
                .iter()
                .enumerate()
                .map(|(i, &cfg)| {
                    let id = LockId::new(i);
                    Lock::new(id, cfg, make(id))
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Inspect a lock.
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range identity.
    pub fn get(&self, lock: LockId) -> &Lock<M> {
        &self.locks[self.index(lock)]
    }

    /// Request `lock` on behalf of `caller`.
    ///
    /// A denied request is a normal outcome ([`LockStatus::Suspended`] /
    /// [`LockStatus::Contended`]); an `Err` means the run must halt.
    pub fn lock(
        &mut self,
        table: &mut PriorityTable,
        lock: LockId,
        caller: TaskId,
    ) -> Result<LockStatus, LockError> {
        let idx = self.index(lock);
        match self.locks[idx].protocol {
            Protocol::Inheritance => self.lock_inherit(table, idx, caller),
            Protocol::Ceiling => self.lock_ceiling(table, idx, caller),
        }
    }

    /// Release `lock`, restoring every priority its history recorded and
    /// resuming every task it suspended. Returns the number of records
    /// drained (diagnostic only).
    pub fn unlock(
        &mut self,
        table: &mut PriorityTable,
        lock: LockId,
        caller: TaskId,
    ) -> Result<usize, UnlockError> {
        let idx = self.index(lock);
        let lock = &mut self.locks[idx];

        if lock.owner != Some(caller) {
            return Err(UnlockError::NotOwner);
        }
        // An owned lock holds at least its owner's acquisition record.
        if lock.history.is_empty() {
            return Err(UnlockError::BadObjectState);
        }

        lock.raw.unlock()?;

        let drained = lock.history.drain_restore_all(table);
        lock.owner = None;
        if lock.protocol == Protocol::Inheritance {
            // The floor only means anything within a lock/unlock bracket.
            lock.ceiling = Priority::SUSPENDED;
        }
        Ok(drained)
    }

    fn index(&self, lock: LockId) -> usize {
        assert!(lock.get() < self.locks.len(), "{lock} is out of range");
        lock.get()
    }

    /// Inheritance variant, single resource. See the admission rules in the
    /// crate docs.
    fn lock_inherit(
        &mut self,
        table: &mut PriorityTable,
        idx: usize,
        caller: TaskId,
    ) -> Result<LockStatus, LockError> {
        let lock = &mut self.locks[idx];

        if lock.owner == Some(caller) {
            return Err(LockError::WouldDeadlock);
        }

        if lock.raw.try_lock()? {
            if lock.owner.is_some() {
                return Err(LockError::BadObjectState);
            }
            let saved = table.get(caller);
            lock.history.push(DonationRecord {
                task: caller,
                saved,
            });
            // The caller runs at the floor or its own priority, whichever is
            // greater; the floor never decreases while held.
            let boosted = if lock.ceiling > saved { lock.ceiling } else { saved };
            lock.ceiling = boosted;
            table.set(caller, boosted);
            lock.owner = Some(caller);
            Ok(LockStatus::Acquired)
        } else {
            let Some(holder) = lock.owner else {
                return Err(LockError::BadObjectState);
            };
            let requested = table.get(caller);
            if requested > lock.ceiling {
                // The inversion case: the holder inherits the caller's
                // priority, written through the holder's own acquisition
                // record so corrupted ownership is caught first.
                if !lock.history.donate_through(table, holder, requested) {
                    return Err(LockError::BadObjectState);
                }
                lock.ceiling = requested;
                lock.history.push(DonationRecord {
                    task: caller,
                    saved: requested,
                });
                table.set(caller, Priority::SUSPENDED);
                Ok(LockStatus::Suspended { donated: true })
            } else {
                Ok(LockStatus::Contended)
            }
        }
    }

    /// Ceiling variant. Admission consults every lock in the registry:
    /// a free lock is granted iff nothing is held, the caller owns the
    /// max-ceiling held lock (chain continuation), or the caller's priority
    /// exceeds every held ceiling. A denied caller suspends on the held lock
    /// with the maximum ceiling, donating to its owner when strictly more
    /// urgent. Blocking is thereby bounded to one critical-section duration
    /// per lower-priority holder.
    fn lock_ceiling(
        &mut self,
        table: &mut PriorityTable,
        idx: usize,
        caller: TaskId,
    ) -> Result<LockStatus, LockError> {
        if self.locks[idx].owner == Some(caller) {
            return Err(LockError::WouldDeadlock);
        }

        // The held lock with the maximum ceiling; ties go to the lowest lock
        // identity so the choice is deterministic.
        let mut max_held: Option<usize> = None;
        for (i, lock) in self.locks.iter().enumerate() {
            if lock.owner.is_some()
                && max_held.map_or(true, |m| lock.ceiling > self.locks[m].ceiling)
            {
                max_held = Some(i);
            }
        }

        let requested = table.get(caller);
        let free = self.locks[idx].owner.is_none();
        let grant = match max_held {
            None => true,
            Some(m) => {
                free && (self.locks[m].owner == Some(caller) || requested > self.locks[m].ceiling)
            }
        };

        if grant {
            let lock = &mut self.locks[idx];
            if !lock.raw.try_lock()? {
                // Bookkeeping said the lock was free; the primitive
                // disagrees.
                return Err(LockError::BadObjectState);
            }
            lock.history.push(DonationRecord {
                task: caller,
                saved: requested,
            });
            lock.owner = Some(caller);
            Ok(LockStatus::Acquired)
        } else {
            let Some(m) = max_held else {
                return Err(LockError::BadObjectState);
            };
            let Some(holder) = self.locks[m].owner else {
                return Err(LockError::BadObjectState);
            };
            if holder == caller {
                // Only reachable with ill-formed ceiling assignments; the
                // caller would wait on its own unlock forever.
                return Err(LockError::WouldDeadlock);
            }

            let holder_priority = table.get(holder);
            let donated = requested > holder_priority;
            let target = &mut self.locks[m];
            if donated {
                target.history.push(DonationRecord {
                    task: holder,
                    saved: holder_priority,
                });
                table.set(holder, requested);
            }
            target.history.push(DonationRecord {
                task: caller,
                saved: requested,
            });
            table.set(caller, Priority::SUSPENDED);
            Ok(LockStatus::Suspended { donated })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::LockCfg;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn pri(value: f32) -> Priority {
        Priority::new(value)
    }

    fn task(id: usize) -> TaskId {
        TaskId::new(id)
    }

    fn lock_id(id: usize) -> LockId {
        LockId::new(id)
    }

    /// A table with the given released priorities.
    fn table_of(priorities: &[f32]) -> PriorityTable {
        let mut table = PriorityTable::new(priorities.len());
        for (i, &p) in priorities.iter().enumerate() {
            table.set(task(i), pri(p));
        }
        table
    }

    fn pi_registry() -> LockRegistry {
        LockRegistry::new(&[LockCfg::inheritance()])
    }

    fn pc_registry(ceilings: &[f32]) -> LockRegistry {
        let cfgs: Vec<_> = ceilings.iter().map(|&c| LockCfg::ceiling(pri(c))).collect();
        LockRegistry::new(&cfgs)
    }

    /// The held lock with the maximum ceiling, ties toward the lowest
    /// identity: the same choice the registry makes.
    fn max_held_lock(locks: &LockRegistry) -> Option<LockId> {
        let mut max_held: Option<LockId> = None;
        for l in (0..locks.len()).map(LockId::new) {
            if locks.get(l).is_locked()
                && max_held.map_or(true, |m| locks.get(l).ceiling() > locks.get(m).ceiling())
            {
                max_held = Some(l);
            }
        }
        max_held
    }

    #[test]
    fn inherit_acquire_records_owner_and_floor() {
        let mut table = table_of(&[0.5]);
        let mut locks = pi_registry();

        assert_eq!(
            locks.lock(&mut table, lock_id(0), task(0)),
            Ok(LockStatus::Acquired)
        );
        let lock = locks.get(lock_id(0));
        assert_eq!(lock.owner(), Some(task(0)));
        assert_eq!(lock.ceiling(), pri(0.5));
        assert_eq!(lock.history_depth(), 1);
        // Acquisition at an empty floor leaves the caller's priority alone.
        assert_eq!(table.get(task(0)), pri(0.5));
    }

    #[test]
    fn inherit_contender_above_floor_donates_and_suspends() {
        let mut table = table_of(&[0.5, 0.7]);
        let mut locks = pi_registry();

        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        assert_eq!(
            locks.lock(&mut table, lock_id(0), task(1)),
            Ok(LockStatus::Suspended { donated: true })
        );

        // The holder inherited 0.7, the contender is parked at zero.
        assert_eq!(table.get(task(0)), pri(0.7));
        assert!(table.get(task(1)).is_suspended());
        assert_eq!(locks.get(lock_id(0)).ceiling(), pri(0.7));
        assert_eq!(locks.get(lock_id(0)).history_depth(), 2);
    }

    #[test]
    fn inherit_unlock_restores_everything_and_resets_the_floor() {
        let mut table = table_of(&[0.5, 0.7]);
        let mut locks = pi_registry();

        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        locks.lock(&mut table, lock_id(0), task(1)).unwrap();

        assert_eq!(locks.unlock(&mut table, lock_id(0), task(0)), Ok(2));
        assert_eq!(table.get(task(0)), pri(0.5));
        assert_eq!(table.get(task(1)), pri(0.7));
        assert_eq!(locks.get(lock_id(0)).owner(), None);

        // The floor is back at neutral: a low-priority acquisition is not
        // boosted by the previous bracket.
        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        assert_eq!(table.get(task(0)), pri(0.5));
    }

    #[test]
    fn inherit_contender_at_or_below_floor_stays_ready() {
        let mut table = table_of(&[0.5, 0.5, 0.3]);
        let mut locks = pi_registry();

        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        // Equal to the floor: no inversion, no suspension.
        assert_eq!(
            locks.lock(&mut table, lock_id(0), task(1)),
            Ok(LockStatus::Contended)
        );
        assert_eq!(
            locks.lock(&mut table, lock_id(0), task(2)),
            Ok(LockStatus::Contended)
        );
        assert_eq!(table.get(task(1)), pri(0.5));
        assert_eq!(table.get(task(2)), pri(0.3));
        assert_eq!(locks.get(lock_id(0)).history_depth(), 1);
    }

    #[test]
    fn inherit_successive_donations_drain_in_lifo_order() {
        let mut table = table_of(&[0.5, 0.6, 0.7]);
        let mut locks = pi_registry();

        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        locks.lock(&mut table, lock_id(0), task(1)).unwrap();
        assert_eq!(table.get(task(0)), pri(0.6));
        locks.lock(&mut table, lock_id(0), task(2)).unwrap();
        assert_eq!(table.get(task(0)), pri(0.7));

        assert_eq!(locks.unlock(&mut table, lock_id(0), task(0)), Ok(3));
        assert_eq!(table.snapshot(), vec![pri(0.5), pri(0.6), pri(0.7)]);
    }

    #[test]
    fn inherit_floor_blocks_later_medium_contender() {
        let mut table = table_of(&[0.5, 0.7, 0.6]);
        let mut locks = pi_registry();

        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        locks.lock(&mut table, lock_id(0), task(1)).unwrap();
        // 0.6 does not exceed the raised floor of 0.7.
        assert_eq!(
            locks.lock(&mut table, lock_id(0), task(2)),
            Ok(LockStatus::Contended)
        );
    }

    #[test]
    fn self_relock_fails_fast() {
        let mut table = table_of(&[0.5]);
        let mut locks = pi_registry();
        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        assert_eq!(
            locks.lock(&mut table, lock_id(0), task(0)),
            Err(LockError::WouldDeadlock)
        );

        let mut table = table_of(&[0.5]);
        let mut locks = pc_registry(&[0.9]);
        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        assert_eq!(
            locks.lock(&mut table, lock_id(0), task(0)),
            Err(LockError::WouldDeadlock)
        );
    }

    #[test]
    fn unlock_by_non_owner_is_rejected() {
        let mut table = table_of(&[0.5, 0.7]);
        let mut locks = pi_registry();

        assert_eq!(
            locks.unlock(&mut table, lock_id(0), task(0)),
            Err(UnlockError::NotOwner)
        );
        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        assert_eq!(
            locks.unlock(&mut table, lock_id(0), task(1)),
            Err(UnlockError::NotOwner)
        );
        // The failed unlock must not have touched anything.
        assert_eq!(locks.get(lock_id(0)).owner(), Some(task(0)));
        assert_eq!(locks.get(lock_id(0)).history_depth(), 1);
    }

    #[test]
    fn ceiling_grants_when_nothing_is_held() {
        let mut table = table_of(&[0.5]);
        let mut locks = pc_registry(&[0.9]);
        assert_eq!(
            locks.lock(&mut table, lock_id(0), task(0)),
            Ok(LockStatus::Acquired)
        );
        // No hoisting on grant; only ownership is recorded.
        assert_eq!(table.get(task(0)), pri(0.5));
        assert_eq!(locks.get(lock_id(0)).history_depth(), 1);
    }

    #[test]
    fn ceiling_grants_chain_continuation_to_max_ceiling_owner() {
        let mut table = table_of(&[0.5]);
        let mut locks = pc_registry(&[0.9, 0.4]);

        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        // 0.5 does not exceed the held ceiling 0.9, but the caller owns that
        // lock, so the chain continues.
        assert_eq!(
            locks.lock(&mut table, lock_id(1), task(0)),
            Ok(LockStatus::Acquired)
        );
    }

    #[test]
    fn ceiling_grants_when_priority_exceeds_every_held_ceiling() {
        let mut table = table_of(&[0.5, 0.7]);
        let mut locks = pc_registry(&[0.6, 0.9]);

        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        assert_eq!(
            locks.lock(&mut table, lock_id(1), task(1)),
            Ok(LockStatus::Acquired)
        );
    }

    #[test]
    fn ceiling_suspends_without_donation_below_holder_priority() {
        let mut table = table_of(&[0.5, 0.4]);
        let mut locks = pc_registry(&[0.7, 0.9]);

        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        assert_eq!(
            locks.lock(&mut table, lock_id(1), task(1)),
            Ok(LockStatus::Suspended { donated: false })
        );
        assert!(table.get(task(1)).is_suspended());
        assert_eq!(table.get(task(0)), pri(0.5));
        // The suspension landed on the held lock, not the requested one.
        assert_eq!(locks.get(lock_id(0)).history_depth(), 2);
        assert_eq!(locks.get(lock_id(1)).history_depth(), 0);
    }

    #[test]
    fn ceiling_donates_when_more_urgent_than_holder() {
        let mut table = table_of(&[0.5, 0.7]);
        let mut locks = pc_registry(&[0.7]);

        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        // 0.7 does not *exceed* the 0.7 ceiling, so no grant; it does exceed
        // the holder's 0.5, so the holder inherits it.
        assert_eq!(
            locks.lock(&mut table, lock_id(0), task(1)),
            Ok(LockStatus::Suspended { donated: true })
        );
        assert_eq!(table.get(task(0)), pri(0.7));
        assert!(table.get(task(1)).is_suspended());
    }

    #[test]
    fn ceiling_suspension_lands_on_the_max_ceiling_lock() {
        let mut table = table_of(&[0.4, 0.5, 0.7]);
        let mut locks = pc_registry(&[0.6, 0.8, 0.9]);

        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        locks.lock(&mut table, lock_id(1), task(1)).unwrap();

        // 0.7 beats neither held ceiling's maximum (0.8), so task 2 suspends
        // on lock 1 and donates to its owner (0.7 > 0.5).
        assert_eq!(
            locks.lock(&mut table, lock_id(2), task(2)),
            Ok(LockStatus::Suspended { donated: true })
        );
        assert_eq!(table.get(task(1)), pri(0.7));
        assert_eq!(locks.get(lock_id(1)).history_depth(), 3);
        assert_eq!(locks.get(lock_id(0)).history_depth(), 1);

        // Unlocking lock 1 resumes task 2 and restores its owner; lock 0's
        // bracket is untouched.
        assert_eq!(locks.unlock(&mut table, lock_id(1), task(1)), Ok(3));
        assert_eq!(table.get(task(1)), pri(0.5));
        assert_eq!(table.get(task(2)), pri(0.7));
        assert_eq!(locks.get(lock_id(0)).owner(), Some(task(0)));
    }

    #[test]
    fn ceiling_never_grants_a_held_lock() {
        let mut table = table_of(&[0.5, 0.9]);
        let mut locks = pc_registry(&[0.7]);

        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        // Even a priority above every ceiling must wait for the lock itself.
        assert_eq!(
            locks.lock(&mut table, lock_id(0), task(1)),
            Ok(LockStatus::Suspended { donated: true })
        );
        assert_eq!(locks.get(lock_id(0)).owner(), Some(task(0)));
    }

    #[test]
    fn ceiling_self_suspension_from_ill_formed_ceilings_fails_fast() {
        let mut table = table_of(&[0.9, 0.3]);
        let mut locks = pc_registry(&[0.9, 0.2]);

        locks.lock(&mut table, lock_id(1), task(1)).unwrap();
        locks.lock(&mut table, lock_id(0), task(0)).unwrap();
        // Task 0 owns the max-ceiling lock but asks for a lock held by
        // task 1; suspending it on its own lock could never be undone.
        assert_eq!(
            locks.lock(&mut table, lock_id(1), task(0)),
            Err(LockError::WouldDeadlock)
        );
    }

    #[test]
    fn raw_fault_is_surfaced_as_fatal() {
        /// Fails every operation, standing in for a primitive that ran out
        /// of resources.
        struct BrokenMutex;

        impl RawMutex for BrokenMutex {
            fn try_lock(&mut self) -> Result<bool, RawMutexFault> {
                Err(RawMutexFault)
            }
            fn unlock(&mut self) -> Result<(), RawMutexFault> {
                Err(RawMutexFault)
            }
        }

        let mut table = table_of(&[0.5]);
        let mut locks =
            LockRegistry::with_raw_mutexes(&[LockCfg::inheritance()], |_| BrokenMutex);
        assert_eq!(
            locks.lock(&mut table, lock_id(0), task(0)),
            Err(LockError::Fault)
        );
    }

    /// The ceiling admission law, checked against an independent prediction
    /// over randomized operation sequences: a free lock is granted iff
    /// nothing is held, the caller owns the max-ceiling held lock, or the
    /// caller's priority exceeds every held ceiling.
    #[quickcheck]
    fn qc_ceiling_admission_law(ops: Vec<(u8, u8)>, seeds: Vec<u8>) -> TestResult {
        const TASKS: usize = 4;
        const CEILINGS: [f32; 3] = [0.35, 0.65, 0.95];

        let priorities: Vec<f32> = (0..TASKS)
            .map(|i| 0.1 * f32::from(seeds.get(i).copied().unwrap_or(i as u8) % 9 + 1))
            .collect();
        let mut table = table_of(&priorities);
        let baseline = table.clone();
        let mut locks = pc_registry(&CEILINGS);

        for &(t, l) in &ops {
            let caller = task(t as usize % TASKS);
            let lock = lock_id(l as usize % CEILINGS.len());

            // Suspended tasks cannot issue requests (single caller per task).
            if table.get(caller).is_suspended() {
                continue;
            }

            if locks.get(lock).owner() == Some(caller) {
                if locks.unlock(&mut table, lock, caller).is_err() {
                    return TestResult::failed();
                }
                continue;
            }

            // Predict the outcome before mutating anything.
            let max_held = max_held_lock(&locks);
            let requested = table.get(caller);
            let expect_grant = match max_held {
                None => true,
                Some(m) => {
                    locks.get(lock).owner().is_none()
                        && (locks.get(m).owner() == Some(caller)
                            || requested > locks.get(m).ceiling())
                }
            };
            let expect_deadlock =
                !expect_grant && max_held.is_some_and(|m| locks.get(m).owner() == Some(caller));
            let expect_donation = !expect_grant
                && !expect_deadlock
                && max_held.is_some_and(|m| {
                    requested > table.get(locks.get(m).owner().unwrap())
                });

            match locks.lock(&mut table, lock, caller) {
                Ok(LockStatus::Acquired) => {
                    if !expect_grant {
                        return TestResult::failed();
                    }
                }
                Ok(LockStatus::Suspended { donated }) => {
                    if expect_grant
                        || donated != expect_donation
                        || !table.get(caller).is_suspended()
                    {
                        return TestResult::failed();
                    }
                }
                Ok(LockStatus::Contended) => return TestResult::failed(),
                Err(LockError::WouldDeadlock) if expect_deadlock => {}
                Err(_) => return TestResult::failed(),
            }
        }

        // Drain every bracket, always releasing the max-ceiling lock first
        // (suspension records only ever sit above the suspended task's own
        // brackets in that order), and verify full restoration.
        while let Some(m) = max_held_lock(&locks) {
            let owner = locks.get(m).owner().unwrap();
            if locks.unlock(&mut table, m, owner).is_err() {
                return TestResult::failed();
            }
        }
        TestResult::from_bool(table == baseline)
    }

    /// Every full unlock of an inheritance lock restores the table to its
    /// pre-bracket state, bit-exactly, no matter how contenders interleave.
    #[quickcheck]
    fn qc_inheritance_restores_the_table(ops: Vec<u8>) -> bool {
        const PRIORITIES: [f32; 4] = [0.2, 0.4, 0.6, 0.8];

        let mut table = table_of(&PRIORITIES);
        let baseline = table.clone();
        let mut locks = pi_registry();
        let lock = lock_id(0);

        for &op in &ops {
            let caller = task(op as usize % PRIORITIES.len());
            if table.get(caller).is_suspended() {
                continue;
            }
            if locks.get(lock).owner() == Some(caller) {
                locks.unlock(&mut table, lock, caller).unwrap();
                if table != baseline {
                    return false;
                }
            } else {
                locks.lock(&mut table, lock, caller).unwrap();
            }
        }

        if let Some(owner) = locks.get(lock).owner() {
            locks.unlock(&mut table, lock, owner).unwrap();
        }
        table == baseline
    }
}

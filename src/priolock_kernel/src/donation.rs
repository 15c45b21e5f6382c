//! Donation bookkeeping.
//!
//! Every priority change a lock protocol makes (boosting an acquirer,
//! donating to a holder, suspending a contender) pushes a record onto the
//! lock's [`DonationHistory`]. A full unlock drains the history in strict
//! LIFO order, so later donations are undone before earlier ones and no task
//! is ever restored to a stale intermediate value.
use arrayvec::ArrayVec;

use crate::task::{Priority, PriorityTable, TaskId, MAX_TASKS};

/// Upper bound on the records a single lock can accumulate between full
/// unlocks: two per contender (one donation to the holder, one suspension)
/// plus the owner's own record.
const CAPACITY: usize = MAX_TASKS * 2;

/// One undo entry: which table slot to restore and the value to restore
/// there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DonationRecord {
    /// The task whose priority slot this record references.
    pub task: TaskId,
    /// The priority the slot held immediately before the donation event.
    pub saved: Priority,
}

/// A per-lock LIFO stack of [`DonationRecord`]s.
#[derive(Debug, Default)]
pub struct DonationHistory {
    records: ArrayVec<DonationRecord, CAPACITY>,
}

impl DonationHistory {
    pub const fn new() -> Self {
        Self {
            records: ArrayVec::new_const(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record a donation event.
    ///
    /// # Panics
    ///
    /// Panics on overflow. The capacity covers the worst case a well-formed
    /// run can produce, so overflow means the caller has broken the
    /// one-record-per-event discipline.
    pub fn push(&mut self, record: DonationRecord) {
        assert!(!self.records.is_full(), "donation history overflow");
        self.records.push(record);
    }

    /// Write `priority` into the table slot referenced by the most recent
    /// record keyed to `task`.
    ///
    /// This is how a donation reaches a lock holder: the holder's slot is
    /// located through its own acquisition record rather than trusted from
    /// the caller, so a missing record (returning `false`) reveals corrupted
    /// ownership bookkeeping before the table is touched.
    pub fn donate_through(
        &self,
        table: &mut PriorityTable,
        task: TaskId,
        priority: Priority,
    ) -> bool {
        for record in self.records.iter().rev() {
            if record.task == task {
                table.set(record.task, priority);
                return true;
            }
        }
        false
    }

    /// Pop every record in LIFO order, restoring each saved priority into the
    /// slot it references. Returns the number of records drained; the count
    /// is diagnostic only.
    pub fn drain_restore_all(&mut self, table: &mut PriorityTable) -> usize {
        let drained = self.records.len();
        while let Some(record) = self.records.pop() {
            table.set(record.task, record.saved);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(task: usize, saved: f32) -> DonationRecord {
        DonationRecord {
            task: TaskId::new(task),
            saved: Priority::new(saved),
        }
    }

    #[test]
    fn drain_restores_in_lifo_order() {
        let mut table = PriorityTable::new(2);
        let mut history = DonationHistory::new();

        // Task 0 acquires at 0.5, then two successive donations raise it.
        // The stale intermediate value (0.6) is pushed *after* the original,
        // so a LIFO drain must restore 0.6 before finally settling on 0.5.
        history.push(record(0, 0.5));
        table.set(TaskId::new(0), Priority::new(0.6));
        history.push(record(0, 0.6));
        table.set(TaskId::new(0), Priority::new(0.7));

        assert_eq!(history.drain_restore_all(&mut table), 2);
        assert_eq!(table.get(TaskId::new(0)), Priority::new(0.5));
        assert!(history.is_empty());
    }

    #[test]
    fn drain_resumes_suspended_tasks() {
        let mut table = PriorityTable::new(2);
        let mut history = DonationHistory::new();

        table.set(TaskId::new(1), Priority::new(0.7));
        history.push(record(1, 0.7));
        table.set(TaskId::new(1), Priority::SUSPENDED);

        assert_eq!(history.drain_restore_all(&mut table), 1);
        assert_eq!(table.get(TaskId::new(1)), Priority::new(0.7));
    }

    #[test]
    fn drain_of_empty_history_is_a_no_op() {
        let mut table = PriorityTable::new(1);
        let mut history = DonationHistory::new();
        assert_eq!(history.drain_restore_all(&mut table), 0);
    }

    #[test]
    fn donate_through_targets_the_most_recent_record() {
        let mut table = PriorityTable::new(3);
        let mut history = DonationHistory::new();
        table.set(TaskId::new(0), Priority::new(0.5));

        history.push(record(0, 0.5));
        history.push(record(1, 0.6));

        assert!(history.donate_through(&mut table, TaskId::new(0), Priority::new(0.7)));
        assert_eq!(table.get(TaskId::new(0)), Priority::new(0.7));
        // No record for task 2; the table must be left untouched.
        assert!(!history.donate_through(&mut table, TaskId::new(2), Priority::new(0.9)));
    }
}

//! Cooperative fixed-priority scheduling policy.
//!
//! The scheduler owns the global scheduling state (the tick counter, the
//! release schedule, and the active-task selector) exclusively; no other
//! component mutates it. It only decides; granting the selected task its
//! tick is the hosting environment's job.
use crate::{
    cfg::TaskCfg,
    task::{PriorityTable, TaskId},
};

/// One unit of schedulable time.
pub type Tick = u32;

#[derive(Debug, Clone, Copy)]
struct Release {
    at: Tick,
    task: TaskId,
    cfg: TaskCfg,
}

/// Tick-driven picker of the single task allowed to run each tick.
#[derive(Debug)]
pub struct Scheduler {
    tick: Tick,
    budget: Tick,
    active: Option<TaskId>,
    releases: Vec<Release>,
}

impl Scheduler {
    pub fn new(tasks: &[TaskCfg], budget: Tick) -> Self {
        Self {
            tick: 0,
            budget,
            active: None,
            releases: tasks
                .iter()
                .enumerate()
                .map(|(i, &cfg)| Release {
                    at: cfg.release_at,
                    task: TaskId::new(i),
                    cfg,
                })
                .collect(),
        }
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn budget(&self) -> Tick {
        self.budget
    }

    /// Whether the configured tick budget has been spent.
    pub fn finished(&self) -> bool {
        self.tick >= self.budget
    }

    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// The task selected by the most recent [`select`](Self::select).
    pub fn active(&self) -> Option<TaskId> {
        self.active
    }

    /// Release every task whose configured release point is the current
    /// tick: set its baseline priority and report it so the host can start
    /// its thread of control. Each task is released exactly once.
    pub fn process_releases(&mut self, table: &mut PriorityTable) -> Vec<TaskId> {
        let tick = self.tick;
        let mut released = Vec::new();
        for release in self.releases.iter().filter(|r| r.at == tick) {
            table.set(release.task, release.cfg.priority);
            released.push(release.task);
        }
        released
    }

    /// Select the ready task with the strictly greatest current priority.
    ///
    /// A zero priority makes a task ineligible. Ties break toward the lowest
    /// task identity: the forward scan only replaces its candidate on a
    /// strictly greater priority, so the choice is deterministic and
    /// independent of anything but the table contents.
    pub fn select(&mut self, table: &PriorityTable) -> Option<TaskId> {
        let mut best: Option<(TaskId, crate::Priority)> = None;
        for (task, priority) in table.iter() {
            if priority.is_suspended() {
                continue;
            }
            if best.map_or(true, |(_, b)| priority > b) {
                best = Some((task, priority));
            }
        }
        self.active = best.map(|(task, _)| task);
        self.active
    }
}

//! Hosted simulation environment for the priolock protocols.
//!
//! The simulator runs one platform thread per task and drives them with a
//! cooperative, tick-granted handoff: each tick, the scheduling policy picks
//! the single highest-priority ready task, the simulator opens that task's
//! gate, and the task executes exactly one scripted step before yielding
//! back. All protocol state (the priority table, the lock registry, the
//! scheduler) lives behind one lock; nothing ever parks while holding it.
//!
//! A denied lock request never blocks a thread: the protocols suspend tasks
//! logically through the zero-priority sentinel, and the suspended thread
//! simply stops being selected until the unlock that drains its donation
//! record restores its priority.
//!
//! Protocol misuse halts the run with a [`SimError`]; worker panics are
//! re-raised on the caller after teardown.

pub mod script;
pub mod threading;
pub mod timer;
pub mod trace;

use std::{panic, sync::Arc, thread};

use priolock_kernel::{
    cfg::SystemCfg, LockError, LockId, LockRegistry, LockStatus, Priority, PriorityTable,
    Scheduler, TaskId, Tick, UnlockError, MAX_TASKS,
};
use slab::Slab;
use spin::Mutex as SpinMutex;

use crate::{
    script::{Action, Script},
    threading::Parker,
    timer::TickSource,
    trace::{Event, Trace},
};

/// Why a run was rejected or aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// The configuration was rejected before the first tick.
    BadConfig(&'static str),
    /// A lock request failed fatally.
    Lock {
        task: TaskId,
        lock: LockId,
        error: LockError,
    },
    /// An unlock failed fatally.
    Unlock {
        task: TaskId,
        lock: LockId,
        error: UnlockError,
    },
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Ticks actually executed.
    pub ticks: Tick,
    /// The recorded event trace.
    pub trace: Trace,
}

/// Mutable state shared by the scheduler loop and every task thread.
///
/// Mutated only while holding the spin lock. Steps are short and nothing
/// parks while holding it, so a spin lock is sufficient. Unlike a poisoning
/// lock, it also keeps teardown working after a worker panic.
#[derive(Debug)]
struct Core {
    table: PriorityTable,
    sched: Scheduler,
    locks: LockRegistry,
    /// Next script step per task.
    cursors: Vec<usize>,
    trace: Trace,
    fault: Option<SimError>,
    shutdown: bool,
}

struct Shared {
    core: SpinMutex<Core>,
    /// One handoff gate per task, keyed by task identity.
    gates: Vec<Parker>,
    /// Where the active task reports step completion.
    sched_gate: Parker,
    scripts: Vec<Script>,
}

struct Worker {
    task: TaskId,
    join: thread::JoinHandle<()>,
}

/// A configured system plus the scripted body of every task.
#[derive(Debug)]
pub struct Simulator {
    cfg: SystemCfg,
    scripts: Vec<Script>,
}

impl Simulator {
    pub fn new(cfg: SystemCfg, scripts: Vec<Script>) -> Self {
        Self { cfg, scripts }
    }

    /// Run to completion with the given tick source.
    ///
    /// Returns after the configured tick budget is spent, or earlier with an
    /// error if a protocol operation failed fatally. Worker panics are
    /// propagated to the caller.
    pub fn run<T: TickSource>(self, mut ticks: T) -> Result<RunReport, SimError> {
        self.validate()?;

        let task_count = self.cfg.tasks.len();
        let shared = Arc::new(Shared {
            core: SpinMutex::new(Core {
                table: PriorityTable::new(task_count),
                sched: Scheduler::new(&self.cfg.tasks, self.cfg.budget),
                locks: LockRegistry::new(&self.cfg.locks),
                cursors: vec![0; task_count],
                trace: Trace::default(),
                fault: None,
                shutdown: false,
            }),
            gates: (0..task_count).map(|_| Parker::new()).collect(),
            sched_gate: Parker::new(),
            scripts: self.scripts,
        });

        let mut workers = Slab::new();
        ticks.start();

        loop {
            let (released, active) = {
                let mut core = shared.core.lock();
                if core.fault.is_some() || core.sched.finished() {
                    break;
                }
                let tick = core.sched.tick();
                let Core {
                    table,
                    sched,
                    trace,
                    ..
                } = &mut *core;

                let released = sched.process_releases(table);
                for &task in &released {
                    let priority = table.get(task);
                    log::debug!("tick {tick}: released {task} at {priority}");
                    trace.push(Event::Released {
                        tick,
                        task,
                        priority,
                    });
                }

                let active = sched.select(table);
                log::trace!("tick {tick}: active = {active:?}");
                trace.push(Event::Tick {
                    tick,
                    priorities: table.snapshot(),
                    active,
                });
                (released, active)
            };

            for task in released {
                let shared = Arc::clone(&shared);
                log::trace!("spawning a worker thread for {task}");
                workers.insert(Worker {
                    task,
                    join: thread::spawn(move || task_main(shared, task)),
                });
            }

            if let Some(task) = active {
                shared.gates[task.get()].unpark();
                shared.sched_gate.park();
            }

            {
                let mut core = shared.core.lock();
                if core.fault.is_some() {
                    break;
                }
                core.sched.advance();
            }
            ticks.wait();
        }

        ticks.stop();

        // Teardown: wake every worker so it can observe the shutdown flag,
        // then join them all, re-raising any panic.
        shared.core.lock().shutdown = true;
        for gate in &shared.gates {
            gate.unpark();
        }
        for (_, worker) in workers {
            log::trace!("joining {}", worker.task);
            if let Err(e) = worker.join.join() {
                panic::resume_unwind(e);
            }
        }

        let mut core = shared.core.lock();
        if let Some(fault) = core.fault {
            return Err(fault);
        }
        Ok(RunReport {
            ticks: core.sched.tick(),
            trace: std::mem::take(&mut core.trace),
        })
    }

    fn validate(&self) -> Result<(), SimError> {
        if self.cfg.tasks.len() > MAX_TASKS {
            return Err(SimError::BadConfig("too many tasks"));
        }
        if self.cfg.tasks.len() != self.scripts.len() {
            return Err(SimError::BadConfig("one script per task is required"));
        }
        if self
            .cfg
            .tasks
            .iter()
            .any(|task| task.priority.is_suspended())
        {
            return Err(SimError::BadConfig(
                "a zero baseline priority would never be scheduled",
            ));
        }
        for script in &self.scripts {
            for action in script.actions() {
                if let Action::Lock(lock) | Action::Unlock(lock) = *action {
                    if lock.get() >= self.cfg.locks.len() {
                        return Err(SimError::BadConfig("script references an unknown lock"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Body of every task thread: wait for a granted tick, run one scripted
/// step, yield back; leave on termination or shutdown.
fn task_main(shared: Arc<Shared>, me: TaskId) {
    log::debug!("{me} is now running");
    loop {
        shared.gates[me.get()].park();

        let mut core = shared.core.lock();
        if core.shutdown || core.fault.is_some() {
            // The scheduler is not waiting on us; just leave.
            break;
        }
        let step = core.cursors[me.get()];
        let action = shared.scripts[me.get()].action_at(step);
        let finished = execute(&mut core, me, action);
        drop(core);

        shared.sched_gate.unpark();
        if finished {
            break;
        }
    }
    log::trace!("{me} thread exiting");
}

/// Run one scripted step. Returns `true` when the task has terminated.
fn execute(core: &mut Core, me: TaskId, action: Action) -> bool {
    let tick = core.sched.tick();
    let Core {
        table,
        locks,
        cursors,
        trace,
        fault,
        ..
    } = core;

    match action {
        Action::Compute => {
            log::trace!("tick {tick}: {me} computes");
            cursors[me.get()] += 1;
        }
        Action::Lock(lock) => match locks.lock(table, lock, me) {
            Ok(LockStatus::Acquired) => {
                log::debug!("tick {tick}: {me} acquired {lock}");
                trace.push(Event::Acquired {
                    tick,
                    task: me,
                    lock,
                });
                cursors[me.get()] += 1;
            }
            Ok(LockStatus::Suspended { donated }) => {
                log::debug!("tick {tick}: {me} suspended on {lock} (donated: {donated})");
                trace.push(Event::Suspended {
                    tick,
                    task: me,
                    lock,
                    donated,
                });
                // Stay on this action; retry once resumed.
            }
            Ok(LockStatus::Contended) => {
                log::trace!("tick {tick}: {me} contended on {lock}");
                trace.push(Event::Contended {
                    tick,
                    task: me,
                    lock,
                });
            }
            Err(error) => {
                log::error!("tick {tick}: {me} failed to lock {lock}: {error:?}");
                *fault = Some(SimError::Lock {
                    task: me,
                    lock,
                    error,
                });
            }
        },
        Action::Unlock(lock) => match locks.unlock(table, lock, me) {
            Ok(restored) => {
                log::debug!("tick {tick}: {me} unlocked {lock}, restored {restored} priorities");
                trace.push(Event::Unlocked {
                    tick,
                    task: me,
                    lock,
                    restored,
                });
                cursors[me.get()] += 1;
            }
            Err(error) => {
                log::error!("tick {tick}: {me} failed to unlock {lock}: {error:?}");
                *fault = Some(SimError::Unlock {
                    task: me,
                    lock,
                    error,
                });
            }
        },
        Action::Exit => {
            log::debug!("tick {tick}: {me} terminated");
            table.set(me, Priority::SUSPENDED);
            trace.push(Event::Exited { tick, task: me });
            return true;
        }
    }
    false
}

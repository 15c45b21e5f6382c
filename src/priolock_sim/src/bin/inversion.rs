//! The classic three-task inversion demonstration.
//!
//! Three tasks with priorities 0.5/0.6/0.7 are released at ticks 0/2/4; the
//! 0.5 and 0.7 tasks share one lock. While the low-priority task holds the
//! lock and the high-priority task contends, the holder runs at the donated
//! priority 0.7; both revert to their baselines at the unlock.
//!
//! ```text
//! inversion [--protocol inheritance|ceiling]
//! ```
//!
//! Set `RUST_LOG=debug` to watch the donation and restoration unfold live.
use std::time::Duration;

use priolock_kernel::{
    cfg::{LockCfg, SystemCfg, TaskCfg},
    LockId, Priority, Protocol,
};
use priolock_sim::{
    script::{Action, Script},
    timer::PulseTimer,
    trace::Event,
    Simulator,
};

fn main() {
    env_logger::init();

    let protocol = parse_protocol();
    let lock = LockId::new(0);

    let cfg = SystemCfg {
        tasks: vec![
            TaskCfg::new(Priority::new(0.5), 0),
            TaskCfg::new(Priority::new(0.6), 2),
            TaskCfg::new(Priority::new(0.7), 4),
        ],
        locks: vec![match protocol {
            Protocol::Inheritance => LockCfg::inheritance(),
            Protocol::Ceiling => LockCfg::ceiling(Priority::new(0.7)),
        }],
        budget: 30,
    };

    let scripts = vec![
        // Lowest priority: takes the lock early and sits on it.
        Script::new(vec![
            Action::Compute,
            Action::Lock(lock),
            Action::Compute,
            Action::Unlock(lock),
            Action::Compute,
            Action::Exit,
        ]),
        // Medium priority: pure computation, the "unrelated" work that makes
        // unbounded inversion possible without a protocol.
        Script::new(vec![
            Action::Compute,
            Action::Compute,
            Action::Compute,
            Action::Compute,
            Action::Compute,
            Action::Compute,
            Action::Exit,
        ]),
        // Highest priority: contends for the same lock at its second step.
        Script::new(vec![
            Action::Compute,
            Action::Lock(lock),
            Action::Unlock(lock),
            Action::Exit,
        ]),
    ];

    log::info!("running the {protocol:?} protocol scenario");
    let timer = PulseTimer::new(Duration::from_millis(250));
    match Simulator::new(cfg, scripts).run(timer) {
        Ok(report) => {
            for event in report.trace.events() {
                // Per-tick snapshots are for the tests; keep the printout to
                // the protocol events.
                if !matches!(event, Event::Tick { .. }) {
                    println!("{event:?}");
                }
            }
            println!("run finished after {} ticks", report.ticks);
        }
        Err(error) => {
            log::error!("run aborted: {error:?}");
            std::process::exit(1);
        }
    }
}

fn parse_protocol() -> Protocol {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--protocol" => match args.next().as_deref() {
                Some("inheritance") => return Protocol::Inheritance,
                Some("ceiling") => return Protocol::Ceiling,
                other => {
                    eprintln!("unknown protocol: {other:?}");
                    std::process::exit(2);
                }
            },
            other => {
                eprintln!("unknown argument: {other}");
                eprintln!("usage: inversion [--protocol inheritance|ceiling]");
                std::process::exit(2);
            }
        }
    }
    Protocol::Ceiling
}

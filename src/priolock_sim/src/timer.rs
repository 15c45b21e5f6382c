//! Periodic tick sources.
use spin::Mutex as SpinMutex;
use std::{
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

/// The periodic pulse source driving the scheduler loop. One pulse is one
/// unit of schedulable time.
pub trait TickSource {
    fn start(&mut self);

    /// Block until the next pulse.
    fn wait(&mut self);

    fn stop(&mut self);
}

/// Wall-clock pulse generator backed by a helper thread.
///
/// The helper sleeps on a command channel with a deadline; dropping the
/// command sender is the stop signal. Pulses are delivered over a second
/// channel that [`wait`](TickSource::wait) receives from.
#[derive(Debug)]
pub struct PulseTimer {
    period: Duration,
    pulses: Option<mpsc::Receiver<()>>,
    stop_send: SpinMutex<Option<mpsc::Sender<()>>>,
    join: Option<thread::JoinHandle<()>>,
}

impl PulseTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            pulses: None,
            stop_send: SpinMutex::new(None),
            join: None,
        }
    }
}

impl TickSource for PulseTimer {
    fn start(&mut self) {
        let (pulse_send, pulse_recv) = mpsc::channel();
        let (stop_send, stop_recv) = mpsc::channel::<()>();
        let period = self.period;

        log::trace!("starting the pulse thread");
        let join = thread::spawn(move || {
            let mut next = Instant::now() + period;
            loop {
                match stop_recv.recv_timeout(next.saturating_duration_since(Instant::now())) {
                    // Dropping the sender is the stop signal.
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        next += period;
                        if pulse_send.send(()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        self.pulses = Some(pulse_recv);
        *self.stop_send.lock() = Some(stop_send);
        self.join = Some(join);
    }

    fn wait(&mut self) {
        let Some(pulses) = &self.pulses else {
            log::warn!("wait called on a pulse timer that was never started");
            return;
        };
        if pulses.recv().is_err() {
            log::warn!("pulse source stopped while waiting");
        }
    }

    fn stop(&mut self) {
        log::trace!("stopping the pulse thread");
        *self.stop_send.lock() = None;
        self.pulses = None;
        if let Some(join) = self.join.take() {
            if let Err(e) = join.join() {
                std::panic::resume_unwind(e);
            }
        }
    }
}

/// A tick source that never waits, letting tests run a whole tick budget as
/// fast as the handoff allows.
#[derive(Debug, Default)]
pub struct ImmediateTicks;

impl TickSource for ImmediateTicks {
    fn start(&mut self) {}
    fn wait(&mut self) {}
    fn stop(&mut self) {}
}

// Scheduler - Dedicated thread that owns the sequencer and keeps the step clock
//
// The thread sleeps on its inbox until the next tick is due. Commands, job
// results and shutdown all arrive through that inbox, so every mutation of
// the sequencer happens on this one thread. Buffer rebuilds and sample loads
// run on a background worker and come back as messages.

use crate::messaging::command::Command;
use crate::sequencer::engine::{Job, JobResult, Sequencer};
use crate::sequencer::state::SequencerState;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Instant;

enum Inbox {
    Command(Command),
    Job(JobResult),
    Shutdown,
}

/// Control side of the running scheduler
pub struct SchedulerHandle {
    inbox: Sender<Inbox>,
    scheduler: Option<JoinHandle<SequencerState>>,
    worker: Option<JoinHandle<()>>,
}

/// Move `sequencer` onto its own thread and start the background worker.
///
/// Stored sample handles are queued for reload before the first command is
/// processed.
pub fn spawn(sequencer: Sequencer) -> io::Result<SchedulerHandle> {
    let (inbox_tx, inbox_rx) = unbounded::<Inbox>();
    let (job_tx, job_rx) = unbounded::<Job>();

    let worker_inbox = inbox_tx.clone();
    let worker = thread::Builder::new()
        .name("sequencer-worker".into())
        .spawn(move || run_worker(job_rx, worker_inbox))?;

    let mut sequencer = sequencer.with_jobs(job_tx);
    let scheduler = thread::Builder::new()
        .name("sequencer".into())
        .spawn(move || {
            sequencer.reload_samples();
            run_scheduler(sequencer, inbox_rx)
        })?;

    log::info!("Scheduler started");
    Ok(SchedulerHandle {
        inbox: inbox_tx,
        scheduler: Some(scheduler),
        worker: Some(worker),
    })
}

fn run_scheduler(mut sequencer: Sequencer, inbox: Receiver<Inbox>) -> SequencerState {
    loop {
        let message = match sequencer.next_deadline() {
            Some(deadline) => inbox.recv_deadline(deadline),
            None => inbox.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match message {
            Ok(Inbox::Command(command)) => sequencer.handle(command, Instant::now()),
            Ok(Inbox::Job(result)) => sequencer.complete(result),
            Ok(Inbox::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        sequencer.poll(Instant::now());
    }

    log::info!("Scheduler stopped");
    sequencer.shutdown()
}

fn run_worker(jobs: Receiver<Job>, inbox: Sender<Inbox>) {
    let mut rng = StdRng::from_entropy();
    // Ends when the sequencer, which owns the job sender, is dropped
    for job in jobs {
        let result = job.run(&mut rng);
        if inbox.send(Inbox::Job(result)).is_err() {
            break;
        }
    }
    log::debug!("Background worker stopped");
}

impl SchedulerHandle {
    /// Queue a command; false once the scheduler has stopped
    pub fn send(&self, command: Command) -> bool {
        self.inbox.send(Inbox::Command(command)).is_ok()
    }

    /// Stop both threads and return the final state. None if the scheduler
    /// thread panicked.
    pub fn shutdown(mut self) -> Option<SequencerState> {
        self.stop_threads()
    }

    fn stop_threads(&mut self) -> Option<SequencerState> {
        let _ = self.inbox.send(Inbox::Shutdown);

        let state = match self.scheduler.take()?.join() {
            Ok(state) => Some(state),
            Err(_) => {
                log::error!("Scheduler thread panicked");
                None
            }
        };

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Background worker panicked");
            }
        }
        state
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if self.scheduler.is_some() {
            self.stop_threads();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::channels::create_event_channel;
    use crate::messaging::notification::SequencerEvent;
    use crate::sequencer::playback::NullOutput;
    use crate::synth::voice::{Gains, VoiceKind};
    use std::time::Duration;

    fn start(state: SequencerState) -> (SchedulerHandle, crate::messaging::EventReceiver) {
        let (events_tx, events_rx) = create_event_channel(1024);
        let sequencer = Sequencer::with_rng(
            state,
            Box::new(NullOutput),
            8000,
            StdRng::seed_from_u64(1),
        )
        .with_events(events_tx);
        (spawn(sequencer).unwrap(), events_rx)
    }

    #[test]
    fn test_commands_reach_state() {
        let (handle, _events) = start(SequencerState::new());
        assert!(handle.send(Command::SetSteps(9)));
        assert!(handle.send(Command::SetPulses {
            voice: VoiceKind::HatClosed,
            pulses: 4,
        }));
        let state = handle.shutdown().unwrap();
        assert_eq!(state.steps(), 9);
        assert_eq!(state.pulses(VoiceKind::HatClosed), Some(4));
    }

    #[test]
    fn test_running_transport_ticks() {
        let (handle, events) = start(SequencerState::new());
        handle.send(Command::SetBpm(260.0));
        handle.send(Command::Start);

        // 231 ms per step
        let mut steps = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(3);
        while steps.len() < 3 && Instant::now() < deadline {
            if let Ok(SequencerEvent::Step(trigger)) = events.recv_timeout(Duration::from_millis(500)) {
                steps.push(trigger.step);
            }
        }
        handle.shutdown();
        assert_eq!(steps, vec![0, 1, 2]);
    }

    #[test]
    fn test_gain_change_goes_through_worker() {
        let (handle, _events) = start(SequencerState::new());
        handle.send(Command::SetNoteGain(0.0));
        let state = handle.shutdown().unwrap();
        assert_eq!(state.gains(), Gains::new(1.0, 0.0));
    }

    #[test]
    fn test_drop_stops_threads() {
        let (handle, events) = start(SequencerState::new());
        handle.send(Command::Start);
        drop(handle);
        // Sender side is gone once the scheduler has exited
        while events.try_recv().is_ok() {}
        assert!(events.recv_timeout(Duration::from_millis(100)).is_err());
    }
}

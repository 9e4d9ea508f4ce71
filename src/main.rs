// Euclid Beats - Headless front end reading line commands from stdin

use euclid_beats::audio::{CaptureSession, CpalCaptureReader, save_recording};
use euclid_beats::messaging::{
    EventReceiver, NotificationCategory, create_playback_channel, create_retire_channel,
};
use euclid_beats::project::{JsonFileStore, RestoredState, StateManager};
use euclid_beats::sequencer::{NullOutput, RingOutput, VoiceOutput, spawn};
use euclid_beats::{
    AppConfig, AudioEngine, Command, Notification, SchedulerHandle, Sequencer, SequencerEvent,
    SequencerState, VoiceKind, VoiceSource, create_event_channel,
};
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

const HELP: &str = "\
Commands:
  play | stop | toggle             transport
  steps <2-32>                     step count
  pulses <voice> <n>               pulse count of snare/hat_open/hat_closed
  random <voice>                   random pulse count
  mute <voice> | unmute <voice>
  step <voice> <index>             toggle one step on/off
  reactivate                       re-enable every step
  bpm <40-260> | tap
  drum <0-100> | note <0-100> | glitch <0-100>
  source <voice> synth|sample
  load <voice> <path>              load a WAV/FLAC sample
  mic rec <voice> | mic stop       record the microphone into a voice
  state | save | help | quit
Voices: kick snare hat_open hat_closed (or blue orange green pink)";

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Command(Command),
    MicRecord(VoiceKind),
    MicStop,
    Show,
    Save,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq)]
enum ParseError {
    #[error("unknown command '{0}', type 'help'")]
    Unknown(String),

    #[error("missing argument: {0}")]
    Missing(&'static str),

    #[error("unknown voice '{0}'")]
    Voice(String),

    #[error("invalid number '{0}'")]
    Number(String),
}

fn parse_line(line: &str, now: Instant) -> Result<Option<Input>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };

    let input = match head.to_ascii_lowercase().as_str() {
        "play" | "start" => Input::Command(Command::Start),
        "stop" => Input::Command(Command::Stop),
        "toggle" => Input::Command(Command::TogglePlay),
        "steps" => Input::Command(Command::SetSteps(number(words.next(), "step count")?)),
        "pulses" => {
            let voice = voice(words.next())?;
            let pulses = number(words.next(), "pulse count")?;
            Input::Command(Command::SetPulses { voice, pulses })
        }
        "random" => Input::Command(Command::RandomizePulses(voice(words.next())?)),
        "mute" | "unmute" => Input::Command(Command::SetMuted {
            voice: voice(words.next())?,
            muted: head.eq_ignore_ascii_case("mute"),
        }),
        "step" => {
            let voice = voice(words.next())?;
            let step = number(words.next(), "step index")?;
            Input::Command(Command::ToggleStep { voice, step })
        }
        "reactivate" => Input::Command(Command::ReactivateAll),
        "bpm" => Input::Command(Command::SetBpm(number(words.next(), "tempo")?)),
        "tap" => Input::Command(Command::Tap(now)),
        "drum" => Input::Command(Command::SetDrumGain(percent(words.next(), "drum volume")?)),
        "note" => Input::Command(Command::SetNoteGain(percent(words.next(), "note volume")?)),
        "glitch" => Input::Command(Command::SetGlitch(percent(words.next(), "glitch level")?)),
        "source" => {
            let voice = voice(words.next())?;
            let source = match words.next().map(str::to_ascii_lowercase).as_deref() {
                Some("synth") => VoiceSource::Synth,
                Some("sample") => VoiceSource::Sample,
                Some(other) => return Err(ParseError::Unknown(other.to_string())),
                None => return Err(ParseError::Missing("synth or sample")),
            };
            Input::Command(Command::SetVoiceSource { voice, source })
        }
        "load" => {
            let voice = voice(words.next())?;
            // Paths may contain spaces
            let handle = words.collect::<Vec<_>>().join(" ");
            if handle.is_empty() {
                return Err(ParseError::Missing("sample path"));
            }
            Input::Command(Command::LoadSample { voice, handle })
        }
        "mic" => match words.next().map(str::to_ascii_lowercase).as_deref() {
            Some("rec") => Input::MicRecord(voice(words.next())?),
            Some("stop") => Input::MicStop,
            Some(other) => return Err(ParseError::Unknown(format!("mic {}", other))),
            None => return Err(ParseError::Missing("rec or stop")),
        },
        "state" => Input::Show,
        "save" => Input::Save,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(input))
}

fn voice(word: Option<&str>) -> Result<VoiceKind, ParseError> {
    let word = word.ok_or(ParseError::Missing("voice"))?;
    VoiceKind::parse(word).ok_or_else(|| ParseError::Voice(word.to_string()))
}

fn number<T: std::str::FromStr>(word: Option<&str>, what: &'static str) -> Result<T, ParseError> {
    let word = word.ok_or(ParseError::Missing(what))?;
    word.parse()
        .map_err(|_| ParseError::Number(word.to_string()))
}

/// Slider value 0-100 mapped to [0, 1]
fn percent(word: Option<&str>, what: &'static str) -> Result<f64, ParseError> {
    number::<f64>(word, what).map(|value| value / 100.0)
}

fn print_notification(notification: &Notification) {
    if notification.is_problem() {
        eprintln!("{}", notification);
    } else {
        println!("{}", notification);
    }
}

fn print_state(state: &SequencerState) {
    println!("{} steps @ {:.1} BPM", state.steps(), state.bpm());
    for lane in state.lanes() {
        let row: String = lane
            .pattern()
            .iter()
            .zip(lane.active_steps())
            .map(|(&hit, &active)| match (hit, active) {
                (true, true) => 'x',
                (true, false) => 'o',
                _ => '.',
            })
            .collect();
        let pulses = lane
            .pulses()
            .map_or_else(|| "all".to_string(), |p| p.to_string());
        println!(
            "  {:<10} {:>3} {} {:?}{}",
            lane.kind().name(),
            pulses,
            row,
            lane.source(),
            if lane.is_muted() { " (muted)" } else { "" }
        );
    }
    let gains = state.gains();
    println!(
        "  drum {:.0}%  note {:.0}%  glitch {:.0}%",
        gains.drum * 100.0,
        gains.note * 100.0,
        state.glitch_level() * 100.0
    );
}

/// Print events and remember the latest state for `save` and `state`
fn watch_events(events: EventReceiver, latest: Arc<Mutex<SequencerState>>) {
    for event in events {
        match event {
            SequencerEvent::Step(trigger) => {
                let lanes: String = VoiceKind::ALL
                    .iter()
                    .zip(trigger.fired)
                    .map(|(kind, fired)| {
                        if fired {
                            kind.name().chars().next().unwrap_or('?')
                        } else {
                            '.'
                        }
                    })
                    .collect();
                log::debug!("step {:02} [{}]", trigger.step, lanes);
            }
            SequencerEvent::StateChanged(state) => match latest.lock() {
                Ok(mut guard) => *guard = *state,
                Err(_) => log::warn!("State snapshot lock poisoned"),
            },
            SequencerEvent::Transport(state) => println!("Transport: {:?}", state),
            SequencerEvent::Tempo(bpm) => println!("Tempo: {:.1} BPM", bpm),
            SequencerEvent::Notification(notification) => print_notification(&notification),
        }
    }
}

fn snapshot(latest: &Mutex<SequencerState>) -> Option<SequencerState> {
    match latest.lock() {
        Ok(guard) => Some(guard.clone()),
        Err(_) => {
            log::warn!("State snapshot lock poisoned");
            None
        }
    }
}

fn save(manager: &mut StateManager<JsonFileStore>, state: &SequencerState) {
    match manager.save(state) {
        Ok(()) => print_notification(&Notification::info(
            NotificationCategory::Persistence,
            format!("State saved to {}", manager.store().path().display()),
        )),
        Err(e) => {
            log::warn!("Failed to save state: {}", e);
            print_notification(&Notification::warning(
                NotificationCategory::Persistence,
                format!("Could not save state: {}", e),
            ));
        }
    }
}

/// Microphone recording in progress
struct Recording {
    voice: VoiceKind,
    session: CaptureSession,
}

fn start_recording(config: &AppConfig, voice: VoiceKind) -> Option<Recording> {
    let factory = CpalCaptureReader::factory(config.capture_sample_rate);
    match CaptureSession::start(factory, config.capture_max_samples()) {
        Ok(session) => {
            println!("Recording {}... type 'mic stop' to finish", voice.name());
            Some(Recording { voice, session })
        }
        Err(e) => {
            log::error!("Failed to start capture: {}", e);
            print_notification(&Notification::error(
                NotificationCategory::Capture,
                format!("Microphone unavailable: {}", e),
            ));
            None
        }
    }
}

fn finish_recording(config: &AppConfig, recording: Recording, scheduler: &SchedulerHandle) {
    let Some(captured) = recording.session.stop(config.capture_stop_timeout()) else {
        print_notification(&Notification::error(
            NotificationCategory::Capture,
            "Capture did not stop in time, recording discarded",
        ));
        return;
    };
    if captured.overflowed {
        log::warn!(
            "Recording hit the {} s limit, later audio was dropped",
            config.capture_max_seconds
        );
    }
    if captured.samples.is_empty() {
        print_notification(&Notification::warning(
            NotificationCategory::Capture,
            "Nothing was recorded",
        ));
        return;
    }

    let path = config.recording_path(recording.voice.name());
    match save_recording(&path, &captured.samples, captured.sample_rate) {
        Ok(()) => {
            println!(
                "Recorded {:.2} s into {}",
                captured.duration(),
                path.display()
            );
            scheduler.send(Command::LoadSample {
                voice: recording.voice,
                handle: path.to_string_lossy().into_owned(),
            });
        }
        Err(e) => print_notification(&Notification::error(
            NotificationCategory::Capture,
            format!("Could not write recording: {}", e),
        )),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Euclid Beats ===");
    let config = AppConfig::load_or_default();

    let mut manager = StateManager::new(JsonFileStore::new(&config.state_path));
    let restored = match manager.restore() {
        Ok(restored) => restored,
        Err(e) => {
            log::warn!("Could not restore state: {}", e);
            print_notification(&Notification::warning(
                NotificationCategory::Persistence,
                format!("Saved state unreadable, starting fresh: {}", e),
            ));
            RestoredState::defaults()
        }
    };
    if !restored.invalid_keys.is_empty() {
        print_notification(&Notification::warning(
            NotificationCategory::Persistence,
            format!("Ignored invalid saved values: {}", restored.invalid_keys.join(", ")),
        ));
    }
    for (voice, handle) in restored.sample_handles() {
        log::info!("Reloading {} sample from {}", voice.name(), handle);
    }

    let (event_tx, event_rx) = create_event_channel(config.event_queue_capacity);
    let (playback_tx, playback_rx) = create_playback_channel(config.playback_queue_capacity);
    let (retire_tx, retire_rx) = create_retire_channel(config.playback_queue_capacity);

    // Keep the engine alive for the whole session
    let (_audio, output, sample_rate): (Option<AudioEngine>, Box<dyn VoiceOutput>, u32) =
        match AudioEngine::start(playback_rx, retire_tx, Some(event_tx.clone())) {
            Ok(engine) => {
                let rate = engine.sample_rate();
                let output = RingOutput::new(playback_tx, retire_rx);
                (Some(engine), Box::new(output) as Box<dyn VoiceOutput>, rate)
            }
            Err(e) => {
                log::error!("Audio output unavailable: {}", e);
                print_notification(&Notification::error(
                    NotificationCategory::Audio,
                    format!("No audio output, running silent: {}", e),
                ));
                (None, Box::new(NullOutput), config.sample_rate)
            }
        };

    let latest = Arc::new(Mutex::new(restored.state.clone()));
    let watcher_state = latest.clone();
    if let Err(e) = thread::Builder::new()
        .name("event-watcher".into())
        .spawn(move || watch_events(event_rx, watcher_state))
    {
        log::error!("Failed to start event watcher: {}", e);
    }

    print_state(&restored.state);
    let sequencer = Sequencer::new(restored.state, output, sample_rate).with_events(event_tx);
    let scheduler = match spawn(sequencer) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            log::error!("Failed to start the scheduler: {}", e);
            return;
        }
    };
    scheduler.send(Command::Start);
    println!("Type 'help' for commands.");

    let mut recording: Option<Recording> = None;
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("stdin: {}", e);
                break;
            }
        };

        match parse_line(&line, Instant::now()) {
            Ok(None) => {}
            Ok(Some(Input::Command(command))) => {
                let structural = command.is_structural();
                scheduler.send(command);
                if structural {
                    scheduler.send(Command::ReactivateAll);
                }
            }
            Ok(Some(Input::MicRecord(voice))) => {
                if recording.is_some() {
                    println!("Already recording, type 'mic stop' first");
                } else {
                    recording = start_recording(&config, voice);
                }
            }
            Ok(Some(Input::MicStop)) => match recording.take() {
                Some(active) => finish_recording(&config, active, &scheduler),
                None => println!("Not recording"),
            },
            Ok(Some(Input::Show)) => {
                if let Some(state) = snapshot(&latest) {
                    print_state(&state);
                }
            }
            Ok(Some(Input::Save)) => {
                if let Some(state) = snapshot(&latest) {
                    save(&mut manager, &state);
                }
            }
            Ok(Some(Input::Help)) => println!("{}", HELP),
            Ok(Some(Input::Quit)) => break,
            Err(e) => println!("{}", e),
        }
        let _ = io::stdout().flush();
    }

    if let Some(active) = recording.take() {
        let _ = active.session.stop(config.capture_stop_timeout());
    }
    match scheduler.shutdown() {
        Some(state) => save(&mut manager, &state),
        None => log::error!("Sequencer state lost, nothing saved"),
    }
    println!("Bye");
}

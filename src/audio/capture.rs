// Microphone capture - Dedicated thread filling a private, bounded buffer
//
// The capture thread owns its reader and its buffer. Nothing is shared while
// it runs: the finished buffer is handed back by value through a single-use
// channel when the session is stopped.

use crate::audio::format_conversion::{f32_to_i16, interleaved_frame_to_mono};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// How long the capture thread sleeps when the reader has nothing new
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Samples pulled from the reader per iteration
const READ_CHUNK: usize = 1024;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No audio input device found")]
    NoDevice,

    #[error("Input configuration error: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("Failed to start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("Unsupported input sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Input stream failed")]
    StreamFailed,

    #[error("Could not spawn capture thread: {0}")]
    Thread(#[from] io::Error),

    #[error("Capture thread exited before reporting")]
    ThreadGone,
}

/// Source of mono 16-bit samples for a capture session
pub trait CaptureReader {
    /// Copy up to `buf.len()` new samples into `buf`; 0 when none are ready
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, CaptureError>;

    fn sample_rate(&self) -> u32;
}

/// Opens the reader on the capture thread
pub type ReaderFactory = Box<dyn FnOnce() -> Result<Box<dyn CaptureReader>, CaptureError> + Send>;

/// Finished capture, handed over exactly once
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    /// Some reads were dropped because the buffer was full
    pub overflowed: bool,
}

impl CapturedAudio {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

pub struct CaptureSession {
    stop_tx: Sender<()>,
    result_rx: Receiver<CapturedAudio>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureSession {
    /// Spawn the capture thread and wait until the reader is open.
    ///
    /// A reader that fails to open is reported here as an error and the
    /// thread exits; the caller keeps running.
    pub fn start(open: ReaderFactory, max_samples: usize) -> Result<Self, CaptureError> {
        let (ack_tx, ack_rx) = bounded::<Result<(), CaptureError>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (result_tx, result_rx) = bounded::<CapturedAudio>(1);

        let thread = thread::Builder::new()
            .name("capture".into())
            .spawn(move || {
                let reader = match open() {
                    Ok(reader) => {
                        let _ = ack_tx.send(Ok(()));
                        reader
                    }
                    Err(e) => {
                        let _ = ack_tx.send(Err(e));
                        return;
                    }
                };
                let captured = capture_loop(reader, max_samples, &stop_rx);
                let _ = result_tx.send(captured);
            })?;

        match ack_rx.recv() {
            Ok(Ok(())) => {
                log::info!("Capture started (max {} samples)", max_samples);
                Ok(Self {
                    stop_tx,
                    result_rx,
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(CaptureError::ThreadGone)
            }
        }
    }

    /// Ask the thread to stop and wait at most `timeout` for its buffer.
    ///
    /// A timeout is not an error: the session is abandoned, the thread is
    /// detached and None is returned.
    pub fn stop(mut self, timeout: Duration) -> Option<CapturedAudio> {
        let _ = self.stop_tx.send(());
        match self.result_rx.recv_timeout(timeout) {
            Ok(captured) => {
                if let Some(thread) = self.thread.take() {
                    let _ = thread.join();
                }
                log::info!(
                    "Capture stopped: {} samples ({:.2} s)",
                    captured.samples.len(),
                    captured.duration()
                );
                Some(captured)
            }
            Err(_) => {
                log::warn!("Capture thread did not stop within {:?}, stopping anyway", timeout);
                self.thread.take();
                None
            }
        }
    }
}

fn capture_loop(
    mut reader: Box<dyn CaptureReader>,
    max_samples: usize,
    stop_rx: &Receiver<()>,
) -> CapturedAudio {
    let mut buffer = vec![0i16; max_samples];
    let mut len = 0;
    let mut overflowed = false;
    let mut chunk = [0i16; READ_CHUNK];

    loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match reader.read(&mut chunk) {
            Ok(0) => thread::sleep(POLL_INTERVAL),
            Ok(n) => {
                if len + n > max_samples {
                    overflowed = true;
                } else {
                    buffer[len..len + n].copy_from_slice(&chunk[..n]);
                    len += n;
                }
            }
            Err(e) => {
                log::error!("Capture read failed: {}", e);
                break;
            }
        }
    }

    buffer.truncate(len);
    CapturedAudio {
        samples: buffer,
        sample_rate: reader.sample_rate(),
        overflowed,
    }
}

/// Default input device, downmixed to mono and converted to i16
pub struct CpalCaptureReader {
    _stream: Stream,
    consumer: HeapCons<i16>,
    failed: Arc<AtomicBool>,
    sample_rate: u32,
}

impl CpalCaptureReader {
    /// Open the default input at `sample_rate`. Must be called on the thread
    /// that will read from it.
    pub fn open(sample_rate: u32) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;
        log::info!(
            "Input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported = device.default_input_config()?;
        let sample_format = supported.sample_format();
        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // One second of slack between the callback and the capture thread
        let (producer, consumer) = HeapRb::<i16>::new(sample_rate.max(1) as usize).split();
        let failed = Arc::new(AtomicBool::new(false));

        let stream = match sample_format {
            SampleFormat::F32 => build_input::<f32>(&device, &config, producer, failed.clone()),
            SampleFormat::I16 => build_input::<i16>(&device, &config, producer, failed.clone()),
            SampleFormat::U16 => build_input::<u16>(&device, &config, producer, failed.clone()),
            other => return Err(CaptureError::UnsupportedFormat(format!("{:?}", other))),
        }?;
        stream.play()?;

        Ok(Self {
            _stream: stream,
            consumer,
            failed,
            sample_rate,
        })
    }

    /// Factory for `CaptureSession::start`
    pub fn factory(sample_rate: u32) -> ReaderFactory {
        Box::new(move || {
            let reader: Box<dyn CaptureReader> = Box::new(Self::open(sample_rate)?);
            Ok(reader)
        })
    }
}

impl CaptureReader for CpalCaptureReader {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, CaptureError> {
        if self.failed.load(Ordering::Relaxed) {
            return Err(CaptureError::StreamFailed);
        }
        Ok(self.consumer.pop_slice(buf))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

fn build_input<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: HeapProd<i16>,
    failed: Arc<AtomicBool>,
) -> Result<Stream, CaptureError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            for frame in data.chunks(channels) {
                // Full ring: the capture thread is behind, drop the frame
                let _ = producer.try_push(f32_to_i16(interleaved_frame_to_mono(frame)));
            }
        },
        move |err| {
            log::error!("Audio input error: {}", err);
            failed.store(true, Ordering::Relaxed);
        },
        None,
    )?;
    Ok(stream)
}

// Audio engine - CPAL output stream driving the mixer
//
// # Format Support
//
// The device's preferred sample format is used as-is. F32, I16 and U16 are
// supported; mixing is done in f32 and converted when the frame is written.
//
// # Threading
//
// The mixer is moved into the callback, so the callback owns it outright and
// takes no locks. Triggers reach it through the SPSC playback ring and
// replaced sources leave through the retire ring. On macOS
// the Stream is not Send, so the engine stays on the thread that built it.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use thiserror::Error;

use crate::audio::format_conversion::write_mono_to_interleaved_frame;
use crate::audio::mixer::Mixer;
use crate::messaging::channels::{EventSender, PlaybackConsumer, RetiredProducer};
use crate::messaging::notification::{Notification, NotificationCategory, SequencerEvent};

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Audio configuration error: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Error in stream creation: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("Error starting stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("Unsupported sample format: {0}. Supported formats: F32, I16, U16")]
    UnsupportedFormat(String),
}

pub struct AudioEngine {
    _device: Device,
    _stream: Stream,
    sample_rate: u32,
    channels: u16,
}

impl AudioEngine {
    /// Open the default output device and start playing whatever arrives on
    /// `playback_rx`. Sources the mixer releases go out on `retired`. Stream
    /// errors are logged and forwarded to `events`.
    pub fn start(
        playback_rx: PlaybackConsumer,
        retired: RetiredProducer,
        events: Option<EventSender>,
    ) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        log::info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported_config = device.default_output_config()?;
        let sample_format = supported_config.sample_format();
        log::debug!("Audio config: {:?}", supported_config);

        let sample_rate = supported_config.sample_rate().0;
        let channels = supported_config.channels();
        let config: StreamConfig = supported_config.into();

        let mixer = Mixer::new(sample_rate as f32).with_retire(retired);
        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, mixer, playback_rx, events.clone())
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, mixer, playback_rx, events.clone())
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, mixer, playback_rx, events.clone())
            }
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        }?;

        stream.play()?;

        log::info!("Audio engine started: {} Hz, {} channels", sample_rate, channels);
        if let Some(events) = &events {
            let _ = events.try_send(SequencerEvent::Notification(Notification::info(
                NotificationCategory::Audio,
                format!("Audio connected: {} Hz", sample_rate),
            )));
        }

        Ok(Self {
            _device: device,
            _stream: stream,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut mixer: Mixer,
        mut playback_rx: PlaybackConsumer,
        events: Option<EventSender>,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let channels = config.channels.max(1) as usize;
        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // No allocations, no I/O, no locks
                mixer.drain(&mut playback_rx);
                for frame in data.chunks_mut(channels) {
                    write_mono_to_interleaved_frame(mixer.next_sample(), frame);
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
                if let Some(events) = &events {
                    let _ = events.try_send(SequencerEvent::Notification(Notification::error(
                        NotificationCategory::Audio,
                        format!("Audio stream error: {}", err),
                    )));
                }
            },
            None,
        )?;
        Ok(stream)
    }
}

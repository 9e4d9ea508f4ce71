pub mod channels;
pub mod command;
pub mod notification;

pub use channels::{
    EventReceiver, EventSender, PlaybackConsumer, PlaybackProducer, RetiredConsumer,
    RetiredProducer, create_event_channel, create_playback_channel, create_retire_channel,
};
pub use command::{Command, PlaybackCommand};
pub use notification::{Notification, NotificationCategory, NotificationLevel, SequencerEvent};

// Communication channels
// Lock-free SPSC ring for the audio callback, bounded channel for observers

use crate::messaging::command::PlaybackCommand;
use crate::messaging::notification::SequencerEvent;
use crate::sampler::engine::PlaybackSource;
use crossbeam_channel::{Receiver, Sender, bounded};
use ringbuf::{HeapRb, traits::Split};

pub type PlaybackProducer = ringbuf::HeapProd<PlaybackCommand>;
pub type PlaybackConsumer = ringbuf::HeapCons<PlaybackCommand>;

pub fn create_playback_channel(capacity: usize) -> (PlaybackProducer, PlaybackConsumer) {
    let rb = HeapRb::<PlaybackCommand>::new(capacity.max(1));
    rb.split()
}

pub type RetiredProducer = ringbuf::HeapProd<PlaybackSource>;
pub type RetiredConsumer = ringbuf::HeapCons<PlaybackSource>;

/// Return path for sources the callback let go of, so their buffers are freed
/// off the audio thread
pub fn create_retire_channel(capacity: usize) -> (RetiredProducer, RetiredConsumer) {
    HeapRb::<PlaybackSource>::new(capacity.max(1)).split()
}

pub type EventSender = Sender<SequencerEvent>;
pub type EventReceiver = Receiver<SequencerEvent>;

/// Observer channel; the sequencer uses `try_send` and drops events when full
pub fn create_event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    bounded(capacity.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::notification::{Notification, NotificationCategory};
    use ringbuf::traits::{Consumer, Producer};

    #[test]
    fn test_playback_channel_is_bounded() {
        let (mut tx, mut rx) = create_playback_channel(2);
        assert!(tx.try_push(PlaybackCommand::StopAll).is_ok());
        assert!(tx.try_push(PlaybackCommand::StopAll).is_ok());
        assert!(tx.try_push(PlaybackCommand::StopAll).is_err());
        assert!(matches!(rx.try_pop(), Some(PlaybackCommand::StopAll)));
    }

    #[test]
    fn test_event_channel_drops_when_full() {
        let (tx, rx) = create_event_channel(1);
        let event =
            SequencerEvent::Notification(Notification::info(NotificationCategory::Generic, "a"));
        assert!(tx.try_send(event.clone()).is_ok());
        assert!(tx.try_send(event).is_err());
        assert_eq!(rx.len(), 1);
    }
}

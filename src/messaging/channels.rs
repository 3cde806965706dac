// Lock-free notification channel

use crate::messaging::notification::Notification;
use ringbuf::traits::{Consumer, Split};
use ringbuf::HeapRb;

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

/// Create a bounded notification channel
///
/// When the buffer is full, new notifications are dropped by the producer
/// side (`try_push` fails); the UI only ever needs the most recent few.
pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

/// Drain every pending notification, oldest first
pub fn drain(consumer: &mut NotificationConsumer) -> Vec<Notification> {
    consumer.pop_iter().collect()
}

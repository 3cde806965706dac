// Messaging between the history engine and the UI
//
// Trigger adapters push notifications into a ring buffer; the UI drains it
// once per frame and shows non-blocking toasts.

pub mod channels;
pub mod notification;

pub use channels::{NotificationConsumer, NotificationProducer, create_notification_channel};
pub use notification::{Notification, NotificationLevel};

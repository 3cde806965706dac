// Notifications shown to the user after history actions

use crate::history::DomainKey;
use chrono::{DateTime, Duration, Utc};

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Non-blocking message for the UI, with timestamp
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    /// Domain the message is about, if any
    pub domain: Option<DomainKey>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Create a notification stamped with the current time
    pub fn new(level: NotificationLevel, domain: Option<DomainKey>, message: String) -> Self {
        Self {
            level,
            domain,
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn info(domain: Option<DomainKey>, message: String) -> Self {
        Self::new(NotificationLevel::Info, domain, message)
    }

    pub fn warning(domain: Option<DomainKey>, message: String) -> Self {
        Self::new(NotificationLevel::Warning, domain, message)
    }

    pub fn error(domain: Option<DomainKey>, message: String) -> Self {
        Self::new(NotificationLevel::Error, domain, message)
    }

    /// Whether the notification is younger than `max_age_ms`
    pub fn is_recent(&self, max_age_ms: i64) -> bool {
        Utc::now() - self.timestamp < Duration::milliseconds(max_age_ms)
    }
}

// Trigger adapter - Connects shortcuts and toolbar buttons to the registry

use crate::history::domain::DomainKey;
use crate::history::registry::{HistoryError, HistoryOutcome, HistoryRegistry, HistoryResult};
use crate::messaging::{Notification, NotificationProducer};
use ringbuf::traits::Producer;
use std::sync::{Arc, Mutex, PoisonError};

/// A keyboard shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    /// Ctrl on Linux/Windows, Cmd on macOS
    pub ctrl: bool,
    pub shift: bool,
    pub key: char,
}

impl KeyChord {
    pub fn new(ctrl: bool, shift: bool, key: char) -> Self {
        Self { ctrl, shift, key }
    }

    pub fn ctrl(key: char) -> Self {
        Self::new(true, false, key)
    }

    pub fn ctrl_shift(key: char) -> Self {
        Self::new(true, true, key)
    }
}

/// What a trigger asks the history to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

impl HistoryAction {
    /// Map a shortcut to an action
    ///
    /// Ctrl+Z undoes; Ctrl+Shift+Z and Ctrl+Y redo.
    pub fn from_chord(chord: KeyChord) -> Option<Self> {
        if !chord.ctrl {
            return None;
        }
        match (chord.key.to_ascii_lowercase(), chord.shift) {
            ('z', false) => Some(HistoryAction::Undo),
            ('z', true) | ('y', false) => Some(HistoryAction::Redo),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HistoryAction::Undo => "Undo",
            HistoryAction::Redo => "Redo",
        }
    }
}

/// Enablement and labels for undo/redo controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub undo_enabled: bool,
    pub redo_enabled: bool,
    /// e.g. "Undo Add point", or "Undo" when disabled
    pub undo_label: String,
    pub redo_label: String,
}

/// Glue between UI triggers and the history registry
///
/// Controls query `controls` every frame to enable/disable themselves and call
/// `trigger` (or `handle_chord` for shortcuts) to act. Outcomes worth telling
/// the user about are pushed to the notification channel; successful steps are
/// silent.
pub struct TriggerAdapter {
    registry: Arc<HistoryRegistry>,
    notifications: Arc<Mutex<NotificationProducer>>,
}

impl TriggerAdapter {
    pub fn new(
        registry: Arc<HistoryRegistry>,
        notifications: Arc<Mutex<NotificationProducer>>,
    ) -> Self {
        Self {
            registry,
            notifications,
        }
    }

    /// Current state of the undo/redo controls for a domain
    pub fn controls(&self, key: DomainKey) -> ControlState {
        let status = self.registry.status(key);
        let label = |action: HistoryAction, description: Option<String>| match description {
            Some(description) => format!("{} {}", action.label(), description),
            None => action.label().to_string(),
        };
        ControlState {
            undo_enabled: status.can_undo && !status.busy,
            redo_enabled: status.can_redo && !status.busy,
            undo_label: label(HistoryAction::Undo, status.undo_description),
            redo_label: label(HistoryAction::Redo, status.redo_description),
        }
    }

    /// Run an action and notify the user about anything other than success
    ///
    /// # Errors
    /// Returns the registry's error unchanged, after notifying.
    pub async fn trigger(
        &self,
        key: DomainKey,
        action: HistoryAction,
    ) -> HistoryResult<HistoryOutcome> {
        let result = match action {
            HistoryAction::Undo => self.registry.undo(key).await,
            HistoryAction::Redo => self.registry.redo(key).await,
        };

        let verb = action.label().to_lowercase();
        match &result {
            Ok(HistoryOutcome::NothingToDo) => {
                self.notify(Notification::info(Some(key), format!("Nothing to {}", verb)));
            }
            Ok(_) => {}
            Err(HistoryError::Busy(_)) => {
                self.notify(Notification::warning(
                    Some(key),
                    format!("Still finishing the previous step, cannot {} yet", verb),
                ));
            }
            Err(_) => {
                self.notify(Notification::error(
                    Some(key),
                    format!("Could not {} the last change", verb),
                ));
            }
        }
        result
    }

    /// Handle a shortcut; returns `None` if the chord is not a history shortcut
    pub async fn handle_chord(
        &self,
        key: DomainKey,
        chord: KeyChord,
    ) -> Option<HistoryResult<HistoryOutcome>> {
        let action = HistoryAction::from_chord(chord)?;
        Some(self.trigger(key, action).await)
    }

    fn notify(&self, notification: Notification) {
        let mut producer = self
            .notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if producer.try_push(notification).is_err() {
            tracing::warn!("notification channel full, message dropped");
        }
    }
}

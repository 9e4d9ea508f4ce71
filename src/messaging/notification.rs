// Notifications and observer events - Sequencer → front end

use crate::sequencer::state::SequencerState;
use crate::sequencer::transport::{StepTrigger, TransportState};
use std::fmt;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    Audio,
    Sample,
    Capture,
    Persistence,
    Generic,
}

impl NotificationCategory {
    fn label(self) -> &'static str {
        match self {
            NotificationCategory::Audio => "audio",
            NotificationCategory::Sample => "sample",
            NotificationCategory::Capture => "mic",
            NotificationCategory::Persistence => "state",
            NotificationCategory::Generic => "",
        }
    }
}

/// Something the front end should tell the user about
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub category: NotificationCategory,
    pub message: String,
}

impl Notification {
    fn with_level(
        level: NotificationLevel,
        category: NotificationCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            category,
            message: message.into(),
        }
    }

    pub fn info(category: NotificationCategory, message: impl Into<String>) -> Self {
        Self::with_level(NotificationLevel::Info, category, message)
    }

    pub fn warning(category: NotificationCategory, message: impl Into<String>) -> Self {
        Self::with_level(NotificationLevel::Warning, category, message)
    }

    pub fn error(category: NotificationCategory, message: impl Into<String>) -> Self {
        Self::with_level(NotificationLevel::Error, category, message)
    }

    pub fn is_problem(&self) -> bool {
        self.level != NotificationLevel::Info
    }
}

/// `[warning/sample] message`; generic notifications omit the category
impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        match self.category.label() {
            "" => write!(f, "[{}] {}", level, self.message),
            category => write!(f, "[{}/{}] {}", level, category, self.message),
        }
    }
}

/// Everything observers can see; there is no path back into the core
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerEvent {
    /// A tick happened; `fired` says which voices flash
    Step(StepTrigger),
    /// The state was changed by a command or a finished background job
    StateChanged(Box<SequencerState>),
    /// Transport started or stopped
    Transport(TransportState),
    /// Tempo now in force
    Tempo(f64),
    Notification(Notification),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_warning_renders_category() {
        let warning = Notification::warning(NotificationCategory::Sample, "kick.wav unreadable");
        assert_eq!(warning.to_string(), "[warning/sample] kick.wav unreadable");
        assert!(warning.is_problem());
    }

    #[test]
    fn test_generic_info_has_no_category_tag() {
        let info = Notification::info(NotificationCategory::Generic, "ready");
        assert_eq!(info.to_string(), "[info] ready");
        assert!(!info.is_problem());
    }

    #[test]
    fn test_capture_error_label() {
        let error = Notification::error(NotificationCategory::Capture, String::from("no input device"));
        assert_eq!(error.level, NotificationLevel::Error);
        assert_eq!(error.to_string(), "[error/mic] no input device");
    }
}

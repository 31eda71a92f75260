//! Due-date reminders handed to the host notification scheduler.

use crate::model::meeting::Meeting;
use crate::model::parse_due_date;
use crate::model::study::Note;
use crate::model::task::Task;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Local notification request for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub item_id: String,
    pub title: String,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError(pub String);

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification scheduling failed: {}", self.0)
    }
}

impl Error for NotifyError {}

/// Host-side local notification scheduler.
pub trait NotificationScheduler: Send + Sync {
    fn schedule(&self, reminder: &Reminder) -> Result<(), NotifyError>;
}

/// Item shown on a synchronized screen.
pub trait ScreenItem: Clone + Send + 'static {
    fn item_id(&self) -> &str;

    /// Due time that warrants a reminder, if any.
    fn due_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn reminder_title(&self) -> &str;

    /// Reminder for this item when it is due after `now`.
    fn reminder(&self, now: DateTime<Utc>) -> Option<Reminder> {
        let due_at = self.due_at().filter(|due_at| *due_at > now)?;
        Some(Reminder {
            item_id: self.item_id().to_string(),
            title: self.reminder_title().to_string(),
            due_at,
        })
    }
}

impl ScreenItem for Task {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn due_at(&self) -> Option<DateTime<Utc>> {
        if self.is_completed() {
            return None;
        }
        self.due_date.as_deref().and_then(parse_due_date)
    }

    fn reminder_title(&self) -> &str {
        &self.title
    }
}

impl ScreenItem for Meeting {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due_date.as_deref().and_then(parse_due_date)
    }

    fn reminder_title(&self) -> &str {
        &self.title
    }
}

impl ScreenItem for Note {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn reminder_title(&self) -> &str {
        &self.title
    }
}

//! Screen-level view state synchronization.
//!
//! # Responsibility
//! - Drive fetch/refresh lifecycles for screens showing remote collections.
//! - Turn repository errors into user-facing screen errors.
//! - Hand due-date reminders to the host scheduler.
//!
//! # Invariants
//! - Each screen owns its collection; nothing here is shared across screens.

pub mod error;
pub mod phase;
pub mod reminder;
pub mod screen;

pub use error::{ErrorKind, ScreenError};
pub use phase::{next_phase, Phase, Trigger};
pub use reminder::{NotificationScheduler, NotifyError, Reminder, ScreenItem};
pub use screen::{LoadOutcome, LocalMutation, MutationOutcome, ScreenSnapshot, ScreenSync};

//! Notification channel
//!
//! Process-wide queue of user-facing notifications, modelled on the Django
//! messages framework: a notification has a level, a message key (the
//! translation catalog lives elsewhere) and structured arguments. Undoable
//! mutations attach the undo handle so the view can offer an "undo" button.

pub mod channel;
pub mod levels;
pub mod notification;
pub mod storage;

pub use channel::NotificationChannel;
pub use levels::Level;
pub use notification::{Notification, keys};
pub use storage::{MemoryStorage, NotificationStorage};

mod emitter;
mod message;

pub use emitter::NotificationEmitter;
pub use message::{Notification, NotificationKind};

use async_trait::async_trait;

use super::message::Notification;
use crate::shared::DomainError;

/// Fire-and-forget notification sink. Delivery is at-least-once: consumers
/// dedupe on (user, kind, challenge/day). Callers never roll back the state
/// mutation that triggered an emit; a failed emit is logged and dropped.
#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn emit(&self, notification: Notification) -> Result<(), DomainError>;
}

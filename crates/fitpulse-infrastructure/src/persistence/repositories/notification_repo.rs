use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;

use fitpulse_domain::notification::{Notification, NotificationEmitter, NotificationKind};
use fitpulse_domain::shared::{DomainError, NotificationId, UserId};

#[derive(FromRow)]
struct NotificationRow {
    id: String,
    user_id: String,
    kind: String,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    is_read: bool,
}

impl NotificationRow {
    fn try_into_notification(self) -> Result<Notification, DomainError> {
        Ok(Notification::restore(
            NotificationId::from_string(&self.id),
            UserId::from_string(&self.user_id),
            NotificationKind::from_str(&self.kind)?,
            self.title,
            self.content,
            self.created_at,
            self.is_read,
        ))
    }
}

/// Persists emitted notifications as write-once rows. Marking rows read and
/// delivering them to devices belong to the surrounding application.
pub struct SqliteNotificationStore {
    pool: Arc<SqlitePool>,
}

impl SqliteNotificationStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    pub async fn unread_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Notification>, DomainError> {
        let query = r#"
            SELECT
                id,
                user_id,
                kind,
                title,
                content,
                created_at,
                is_read
            FROM notifications
            WHERE user_id = ?1 AND is_read = 0
            ORDER BY created_at DESC
        "#;

        let rows: Vec<NotificationRow> = sqlx::query_as(query)
            .bind(user_id.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("List unread notifications: {e}")))?;

        rows.into_iter().map(|r| r.try_into_notification()).collect()
    }
}

#[async_trait]
impl NotificationEmitter for SqliteNotificationStore {
    async fn emit(&self, notification: Notification) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO notifications (
                id,
                user_id,
                kind,
                title,
                content,
                created_at,
                is_read
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#;

        sqlx::query(query)
            .bind(notification.id().as_str())
            .bind(notification.user_id().as_str())
            .bind(notification.kind().as_str())
            .bind(notification.title())
            .bind(notification.content())
            .bind(notification.created_at())
            .bind(notification.is_read())
            .execute(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Persist notification: {e}")))?;

        Ok(())
    }
}

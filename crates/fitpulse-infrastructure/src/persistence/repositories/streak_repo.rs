use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;

use fitpulse_domain::shared::{DomainError, UserId};
use fitpulse_domain::streak::{Streak, StreakRepository};

#[derive(FromRow)]
struct StreakRow {
    user_id: String,
    current_streak: u32,
    longest_streak: u32,
    last_activity_date: NaiveDate,
    streak_start_date: NaiveDate,
    is_frozen: bool,
    freezes_available: u32,
}

impl StreakRow {
    fn into_streak(self) -> Streak {
        Streak::restore(
            UserId::from_string(&self.user_id),
            self.current_streak,
            self.longest_streak,
            self.last_activity_date,
            self.streak_start_date,
            self.is_frozen,
            self.freezes_available,
        )
    }
}

pub struct SqliteStreakRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteStreakRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        user_id,
        current_streak,
        longest_streak,
        last_activity_date,
        streak_start_date,
        is_frozen,
        freezes_available
    FROM streaks
"#;

#[async_trait]
impl StreakRepository for SqliteStreakRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Streak>, DomainError> {
        let query = format!("{} WHERE user_id = ?1", SELECT_COLUMNS);

        let row: Option<StreakRow> = sqlx::query_as(&query)
            .bind(user_id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Find streak by user: {e}")))?;

        Ok(row.map(|r| r.into_streak()))
    }

    async fn insert(&self, streak: &Streak) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO streaks (
                user_id,
                current_streak,
                longest_streak,
                last_activity_date,
                streak_start_date,
                is_frozen,
                freezes_available
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#;

        sqlx::query(query)
            .bind(streak.user_id().as_str())
            .bind(streak.current_streak())
            .bind(streak.longest_streak())
            .bind(streak.last_activity_date())
            .bind(streak.streak_start_date())
            .bind(streak.is_frozen())
            .bind(streak.freezes_available())
            .execute(&*self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => DomainError::Conflict(
                    format!("Streak already exists for user {}", streak.user_id()),
                ),
                _ => DomainError::Repository(format!("Insert streak: {e}")),
            })?;

        Ok(())
    }

    async fn update_if_unchanged(
        &self,
        updated: &Streak,
        expected: &Streak,
    ) -> Result<bool, DomainError> {
        // Guard on the full previously-read state so concurrent activity
        // events, freeze awards and sweep mutations can never overwrite each
        // other; a lost race surfaces as zero affected rows.
        let query = r#"
            UPDATE streaks SET
                current_streak = ?2,
                longest_streak = ?3,
                last_activity_date = ?4,
                streak_start_date = ?5,
                is_frozen = ?6,
                freezes_available = ?7
            WHERE user_id = ?1
              AND current_streak = ?8
              AND longest_streak = ?9
              AND last_activity_date = ?10
              AND streak_start_date = ?11
              AND is_frozen = ?12
              AND freezes_available = ?13
        "#;

        let result = sqlx::query(query)
            .bind(updated.user_id().as_str())
            .bind(updated.current_streak())
            .bind(updated.longest_streak())
            .bind(updated.last_activity_date())
            .bind(updated.streak_start_date())
            .bind(updated.is_frozen())
            .bind(updated.freezes_available())
            .bind(expected.current_streak())
            .bind(expected.longest_streak())
            .bind(expected.last_activity_date())
            .bind(expected.streak_start_date())
            .bind(expected.is_frozen())
            .bind(expected.freezes_available())
            .execute(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Update streak: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_stale(&self, cutoff: NaiveDate) -> Result<Vec<Streak>, DomainError> {
        let query = format!(
            "{} WHERE is_frozen = 0 AND current_streak > 0 AND last_activity_date < ?1",
            SELECT_COLUMNS
        );

        let rows: Vec<StreakRow> = sqlx::query_as(&query)
            .bind(cutoff)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Find stale streaks: {e}")))?;

        Ok(rows.into_iter().map(|r| r.into_streak()).collect())
    }

    async fn find_at_risk(&self, today: NaiveDate) -> Result<Vec<Streak>, DomainError> {
        let query = format!(
            "{} WHERE current_streak > 0 AND last_activity_date < ?1",
            SELECT_COLUMNS
        );

        let rows: Vec<StreakRow> = sqlx::query_as(&query)
            .bind(today)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Find at-risk streaks: {e}")))?;

        Ok(rows.into_iter().map(|r| r.into_streak()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::Database;
    use chrono::NaiveDate;

    async fn repo() -> (SqliteStreakRepository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("streaks.db");
        let db = Database::new(db_path.to_str().unwrap()).await.unwrap();
        db.run_migrations().await.unwrap();
        (
            SqliteStreakRepository::new(Arc::new(db.pool().clone())),
            dir,
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sweep_cutoff(today: NaiveDate) -> NaiveDate {
        today - chrono::Duration::days(1)
    }

    #[tokio::test]
    async fn test_insert_and_find_round_trip() {
        let (repo, _dir) = repo().await;
        let streak = Streak::started(UserId::new(), date(2025, 3, 10));

        repo.insert(&streak).await.unwrap();
        let found = repo.find_by_user(streak.user_id()).await.unwrap().unwrap();
        assert_eq!(found, streak);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_conflict() {
        let (repo, _dir) = repo().await;
        let streak = Streak::started(UserId::new(), date(2025, 3, 10));

        repo.insert(&streak).await.unwrap();
        let err = repo.insert(&streak).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_conditional_update_rejects_stale_writer() {
        let (repo, _dir) = repo().await;
        let original = Streak::started(UserId::new(), date(2025, 3, 10));
        repo.insert(&original).await.unwrap();

        // First writer extends the streak.
        let mut first = original.clone();
        first.record_activity(date(2025, 3, 11));
        assert!(repo.update_if_unchanged(&first, &original).await.unwrap());

        // Second writer still holds the original snapshot: must lose.
        let mut second = original.clone();
        second.add_freezes(1);
        assert!(!repo.update_if_unchanged(&second, &original).await.unwrap());

        let stored = repo.find_by_user(original.user_id()).await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn test_find_stale_filters_frozen_and_zero_records() {
        let (repo, _dir) = repo().await;
        let today = date(2025, 3, 13);

        let stale = Streak::restore(
            UserId::new(),
            5,
            5,
            date(2025, 3, 10),
            date(2025, 3, 6),
            false,
            1,
        );
        let frozen = Streak::restore(
            UserId::new(),
            5,
            5,
            date(2025, 3, 10),
            date(2025, 3, 6),
            true,
            0,
        );
        let banked = Streak::banked(UserId::new(), date(2025, 3, 1), 2);
        let fresh = Streak::started(UserId::new(), date(2025, 3, 12));

        for s in [&stale, &frozen, &banked, &fresh] {
            repo.insert(s).await.unwrap();
        }

        let found = repo.find_stale(sweep_cutoff(today)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_id(), stale.user_id());
    }

    #[tokio::test]
    async fn test_find_at_risk_includes_frozen_but_not_todays_activity() {
        let (repo, _dir) = repo().await;
        let today = date(2025, 3, 13);

        let at_risk = Streak::restore(
            UserId::new(),
            5,
            5,
            date(2025, 3, 12),
            date(2025, 3, 8),
            false,
            0,
        );
        let active_today = Streak::started(UserId::new(), today);
        let broken = Streak::banked(UserId::new(), date(2025, 3, 1), 0);

        for s in [&at_risk, &active_today, &broken] {
            repo.insert(s).await.unwrap();
        }

        let found = repo.find_at_risk(today).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_id(), at_risk.user_id());
    }
}

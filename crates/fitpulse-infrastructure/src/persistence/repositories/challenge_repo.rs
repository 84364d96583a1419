use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;

use fitpulse_domain::activity::ExerciseKind;
use fitpulse_domain::challenge::{
    Challenge, ChallengeRepository, Participant, ParticipantRepository,
};
use fitpulse_domain::shared::{ChallengeId, DomainError, UserId};

#[derive(FromRow)]
struct ChallengeRow {
    id: String,
    name: String,
    exercise_kind: String,
    goal_amount: f64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    creator_id: String,
    winners_announced: bool,
    ending_soon_notified_at: Option<DateTime<Utc>>,
}

impl ChallengeRow {
    fn try_into_challenge(self) -> Result<Challenge, DomainError> {
        Ok(Challenge::restore(
            ChallengeId::from_string(&self.id),
            self.name,
            ExerciseKind::from_str(&self.exercise_kind)?,
            self.goal_amount,
            self.start_date,
            self.end_date,
            UserId::from_string(&self.creator_id),
            self.winners_announced,
            self.ending_soon_notified_at,
        ))
    }
}

#[derive(FromRow)]
struct ParticipantRow {
    challenge_id: String,
    user_id: String,
    display_name: String,
    current_progress: f64,
    joined_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl ParticipantRow {
    fn into_participant(self) -> Participant {
        Participant::restore(
            ChallengeId::from_string(&self.challenge_id),
            UserId::from_string(&self.user_id),
            self.display_name,
            self.current_progress,
            self.joined_at,
            self.last_updated,
        )
    }
}

const CHALLENGE_COLUMNS: &str = r#"
    SELECT
        id,
        name,
        exercise_kind,
        goal_amount,
        start_date,
        end_date,
        creator_id,
        winners_announced,
        ending_soon_notified_at
    FROM challenges
"#;

pub struct SqliteChallengeRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteChallengeRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChallengeRepository for SqliteChallengeRepository {
    async fn save(&self, challenge: &Challenge) -> Result<(), DomainError> {
        let query = r#"
            INSERT OR REPLACE INTO challenges (
                id,
                name,
                exercise_kind,
                goal_amount,
                start_date,
                end_date,
                creator_id,
                winners_announced,
                ending_soon_notified_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#;

        sqlx::query(query)
            .bind(challenge.id().as_str())
            .bind(challenge.name())
            .bind(challenge.exercise_kind().as_str())
            .bind(challenge.goal_amount())
            .bind(challenge.start_date())
            .bind(challenge.end_date())
            .bind(challenge.creator_id().as_str())
            .bind(challenge.winners_announced())
            .bind(challenge.ending_soon_notified_at())
            .execute(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Save challenge: {e}")))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ChallengeId) -> Result<Option<Challenge>, DomainError> {
        let query = format!("{} WHERE id = ?1", CHALLENGE_COLUMNS);

        let row: Option<ChallengeRow> = sqlx::query_as(&query)
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Find challenge by id: {e}")))?;

        row.map(|r| r.try_into_challenge()).transpose()
    }

    async fn find_active(&self, now: DateTime<Utc>) -> Result<Vec<Challenge>, DomainError> {
        let query = format!(
            "{} WHERE start_date <= ?1 AND end_date >= ?1 ORDER BY end_date",
            CHALLENGE_COLUMNS
        );

        let rows: Vec<ChallengeRow> = sqlx::query_as(&query)
            .bind(now)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Find active challenges: {e}")))?;

        rows.into_iter().map(|r| r.try_into_challenge()).collect()
    }

    async fn find_ending_soon(
        &self,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Challenge>, DomainError> {
        let query = format!(
            "{} WHERE end_date >= ?1 AND end_date <= ?2 AND ending_soon_notified_at IS NULL",
            CHALLENGE_COLUMNS
        );

        let rows: Vec<ChallengeRow> = sqlx::query_as(&query)
            .bind(now)
            .bind(until)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Find ending-soon challenges: {e}")))?;

        rows.into_iter().map(|r| r.try_into_challenge()).collect()
    }

    async fn find_ended_unannounced(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Challenge>, DomainError> {
        let query = format!(
            "{} WHERE end_date < ?1 AND winners_announced = 0",
            CHALLENGE_COLUMNS
        );

        let rows: Vec<ChallengeRow> = sqlx::query_as(&query)
            .bind(now)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Find ended challenges: {e}")))?;

        rows.into_iter().map(|r| r.try_into_challenge()).collect()
    }

    async fn mark_winners_announced(&self, id: &ChallengeId) -> Result<bool, DomainError> {
        // Conditional latch: only one finalizer run can flip the flag.
        let query = r#"
            UPDATE challenges SET winners_announced = 1
            WHERE id = ?1 AND winners_announced = 0
        "#;

        let result = sqlx::query(query)
            .bind(id.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Mark winners announced: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_ending_soon_notified(
        &self,
        id: &ChallengeId,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let query = r#"
            UPDATE challenges SET ending_soon_notified_at = ?2
            WHERE id = ?1 AND ending_soon_notified_at IS NULL
        "#;

        let result = sqlx::query(query)
            .bind(id.as_str())
            .bind(at)
            .execute(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Mark ending soon notified: {e}")))?;

        Ok(result.rows_affected() == 1)
    }
}

pub struct SqliteParticipantRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteParticipantRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

const PARTICIPANT_COLUMNS: &str = r#"
    SELECT
        challenge_id,
        user_id,
        display_name,
        current_progress,
        joined_at,
        last_updated
    FROM challenge_participants
"#;

#[async_trait]
impl ParticipantRepository for SqliteParticipantRepository {
    async fn save(&self, participant: &Participant) -> Result<(), DomainError> {
        let query = r#"
            INSERT OR REPLACE INTO challenge_participants (
                challenge_id,
                user_id,
                display_name,
                current_progress,
                joined_at,
                last_updated
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#;

        sqlx::query(query)
            .bind(participant.challenge_id().as_str())
            .bind(participant.user_id().as_str())
            .bind(participant.display_name())
            .bind(participant.current_progress())
            .bind(participant.joined_at())
            .bind(participant.last_updated())
            .execute(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Save participant: {e}")))?;

        Ok(())
    }

    async fn find(
        &self,
        challenge_id: &ChallengeId,
        user_id: &UserId,
    ) -> Result<Option<Participant>, DomainError> {
        let query = format!(
            "{} WHERE challenge_id = ?1 AND user_id = ?2",
            PARTICIPANT_COLUMNS
        );

        let row: Option<ParticipantRow> = sqlx::query_as(&query)
            .bind(challenge_id.as_str())
            .bind(user_id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Find participant: {e}")))?;

        Ok(row.map(|r| r.into_participant()))
    }

    async fn find_by_challenge(
        &self,
        challenge_id: &ChallengeId,
    ) -> Result<Vec<Participant>, DomainError> {
        let query = format!("{} WHERE challenge_id = ?1", PARTICIPANT_COLUMNS);

        let rows: Vec<ParticipantRow> = sqlx::query_as(&query)
            .bind(challenge_id.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Find challenge participants: {e}")))?;

        Ok(rows.into_iter().map(|r| r.into_participant()).collect())
    }

    async fn find_active_for_user(
        &self,
        user_id: &UserId,
        kind: ExerciseKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Participant, Challenge)>, DomainError> {
        #[derive(FromRow)]
        struct JoinedRow {
            challenge_id: String,
            user_id: String,
            display_name: String,
            current_progress: f64,
            joined_at: DateTime<Utc>,
            last_updated: DateTime<Utc>,
            name: String,
            exercise_kind: String,
            goal_amount: f64,
            start_date: DateTime<Utc>,
            end_date: DateTime<Utc>,
            creator_id: String,
            winners_announced: bool,
            ending_soon_notified_at: Option<DateTime<Utc>>,
        }

        let query = r#"
            SELECT
                p.challenge_id,
                p.user_id,
                p.display_name,
                p.current_progress,
                p.joined_at,
                p.last_updated,
                c.name,
                c.exercise_kind,
                c.goal_amount,
                c.start_date,
                c.end_date,
                c.creator_id,
                c.winners_announced,
                c.ending_soon_notified_at
            FROM challenge_participants p
            JOIN challenges c ON c.id = p.challenge_id
            WHERE p.user_id = ?1
              AND c.exercise_kind = ?2
              AND c.start_date <= ?3
              AND c.end_date >= ?3
        "#;

        let rows: Vec<JoinedRow> = sqlx::query_as(query)
            .bind(user_id.as_str())
            .bind(kind.as_str())
            .bind(now)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Find active participations: {e}")))?;

        rows.into_iter()
            .map(|r| {
                let participant = Participant::restore(
                    ChallengeId::from_string(&r.challenge_id),
                    UserId::from_string(&r.user_id),
                    r.display_name,
                    r.current_progress,
                    r.joined_at,
                    r.last_updated,
                );
                let challenge = Challenge::restore(
                    ChallengeId::from_string(&r.challenge_id),
                    r.name,
                    ExerciseKind::from_str(&r.exercise_kind)?,
                    r.goal_amount,
                    r.start_date,
                    r.end_date,
                    UserId::from_string(&r.creator_id),
                    r.winners_announced,
                    r.ending_soon_notified_at,
                );
                Ok((participant, challenge))
            })
            .collect()
    }

    async fn update_progress_if_unchanged(
        &self,
        participant: &Participant,
        expected_progress: f64,
    ) -> Result<bool, DomainError> {
        let query = r#"
            UPDATE challenge_participants SET
                current_progress = ?3,
                last_updated = ?4
            WHERE challenge_id = ?1
              AND user_id = ?2
              AND current_progress = ?5
        "#;

        let result = sqlx::query(query)
            .bind(participant.challenge_id().as_str())
            .bind(participant.user_id().as_str())
            .bind(participant.current_progress())
            .bind(participant.last_updated())
            .bind(expected_progress)
            .execute(&*self.pool)
            .await
            .map_err(|e| DomainError::Repository(format!("Update participant progress: {e}")))?;

        Ok(result.rows_affected() == 1)
    }
}

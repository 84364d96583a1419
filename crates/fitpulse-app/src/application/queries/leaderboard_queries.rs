use log::info;
use std::sync::Arc;

use fitpulse_domain::challenge::{ranked, ChallengeRepository, ParticipantRepository};
use fitpulse_domain::shared::{ChallengeId, DomainError};

use crate::application::dtos::{ChallengeStandingsDto, StandingDto};

/// Read-only challenge standings projection for UI collaborators. Uses the
/// same total order as the completion finalizer.
pub struct LeaderboardQueries {
    challenges: Arc<dyn ChallengeRepository>,
    participants: Arc<dyn ParticipantRepository>,
}

impl LeaderboardQueries {
    pub fn new(
        challenges: Arc<dyn ChallengeRepository>,
        participants: Arc<dyn ParticipantRepository>,
    ) -> Self {
        Self {
            challenges,
            participants,
        }
    }

    pub async fn standings(
        &self,
        challenge_id: &ChallengeId,
    ) -> Result<ChallengeStandingsDto, DomainError> {
        let challenge = self
            .challenges
            .find_by_id(challenge_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Challenge {}", challenge_id)))?;

        let standings = ranked(self.participants.find_by_challenge(challenge_id).await?);

        let goal = challenge.goal_amount();
        let rows = standings
            .iter()
            .enumerate()
            .map(|(i, p)| StandingDto {
                rank: (i + 1) as u32,
                user_id: p.user_id().to_string(),
                display_name: p.display_name().to_string(),
                progress: p.current_progress(),
                percent_complete: (p.current_progress() / goal * 100.0).min(100.0),
            })
            .collect();

        info!(
            "[leaderboard] standings challenge_id={} participants={}",
            challenge_id,
            standings.len()
        );

        Ok(ChallengeStandingsDto {
            challenge_id: challenge.id().to_string(),
            challenge_name: challenge.name().to_string(),
            exercise_kind: challenge.exercise_kind().as_str().to_string(),
            goal_amount: goal,
            standings: rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use fitpulse_domain::activity::ExerciseKind;
    use fitpulse_domain::challenge::{Challenge, Participant};
    use fitpulse_domain::shared::UserId;
    use fitpulse_infrastructure::memory::{
        InMemoryChallengeRepository, InMemoryParticipantRepository,
    };

    #[tokio::test]
    async fn test_standings_rank_and_percent() {
        let challenges = Arc::new(InMemoryChallengeRepository::new());
        let participants = Arc::new(InMemoryParticipantRepository::new(challenges.clone()));
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

        let challenge = Challenge::new(
            "March Running".to_string(),
            ExerciseKind::Running,
            200.0,
            now - Duration::days(5),
            now + Duration::days(5),
            UserId::new(),
        )
        .unwrap();
        challenges.save(&challenge).await.unwrap();

        for (name, progress) in [("ada", 180.0), ("grace", 150.0), ("joan", 250.0)] {
            let mut p = Participant::join(
                challenge.id().clone(),
                UserId::new(),
                name.to_string(),
                now - Duration::days(4),
            );
            p.add_progress(progress, challenge.goal_amount(), now - Duration::days(1));
            participants.save(&p).await.unwrap();
        }

        let queries = LeaderboardQueries::new(challenges, participants);
        let dto = queries.standings(challenge.id()).await.unwrap();

        assert_eq!(dto.standings.len(), 3);
        assert_eq!(dto.standings[0].display_name, "joan");
        assert_eq!(dto.standings[0].rank, 1);
        // Over-achievers cap at 100 percent.
        assert_eq!(dto.standings[0].percent_complete, 100.0);
        assert_eq!(dto.standings[1].display_name, "ada");
        assert_eq!(dto.standings[1].percent_complete, 90.0);
    }

    #[tokio::test]
    async fn test_unknown_challenge_is_not_found() {
        let challenges = Arc::new(InMemoryChallengeRepository::new());
        let participants = Arc::new(InMemoryParticipantRepository::new(challenges.clone()));
        let queries = LeaderboardQueries::new(challenges, participants);

        let result = queries.standings(&ChallengeId::new()).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }
}

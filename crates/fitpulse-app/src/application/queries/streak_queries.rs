use log::info;
use std::sync::Arc;

use fitpulse_domain::shared::{DomainError, UserId};
use fitpulse_domain::streak::StreakRepository;

use crate::application::dtos::StreakDto;

/// Read-only streak projection for UI collaborators.
pub struct StreakQueries {
    streaks: Arc<dyn StreakRepository>,
}

impl StreakQueries {
    pub fn new(streaks: Arc<dyn StreakRepository>) -> Self {
        Self { streaks }
    }

    pub async fn streak_overview(
        &self,
        user_id: &UserId,
    ) -> Result<Option<StreakDto>, DomainError> {
        let Some(streak) = self.streaks.find_by_user(user_id).await? else {
            return Ok(None);
        };

        let dto = StreakDto::from(&streak);
        info!(
            "[streak] overview user_id={} current={} longest={} state={}",
            dto.user_id, dto.current_streak, dto.longest_streak, dto.state
        );

        Ok(Some(dto))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fitpulse_domain::streak::Streak;
    use fitpulse_infrastructure::memory::InMemoryStreakRepository;

    #[tokio::test]
    async fn test_overview_formats_dates_and_state() {
        let repo = Arc::new(InMemoryStreakRepository::new());
        let user = UserId::new();
        repo.insert(&Streak::restore(
            user.clone(),
            6,
            9,
            NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 6).unwrap(),
            false,
            1,
        ))
        .await
        .unwrap();

        let queries = StreakQueries::new(repo);
        let dto = queries.streak_overview(&user).await.unwrap().unwrap();
        assert_eq!(dto.current_streak, 6);
        assert_eq!(dto.longest_streak, 9);
        assert_eq!(dto.last_activity_date, "2025-03-11");
        assert_eq!(dto.state, "ACTIVE");
    }

    #[tokio::test]
    async fn test_unknown_user_is_none_not_error() {
        let queries = StreakQueries::new(Arc::new(InMemoryStreakRepository::new()));
        assert!(queries
            .streak_overview(&UserId::new())
            .await
            .unwrap()
            .is_none());
    }
}

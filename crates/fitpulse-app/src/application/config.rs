use std::path::PathBuf;

/// Daemon configuration, resolved from environment variables with defaults.
/// Cron expressions use the six-field form (seconds first) understood by the
/// scheduler.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding the database and log files.
    pub data_dir: PathBuf,

    /// Database filename inside `data_dir`.
    pub db_filename: String,

    /// Daily streak reconciliation (default: midnight).
    pub streak_sweep_cron: String,

    /// Evening streak reminders (default: 20:00).
    pub reminder_cron: String,

    /// Challenge lifecycle sweeps (default: 00:05, after the streak sweep).
    pub lifecycle_cron: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitpulse");

        let db_filename = if cfg!(debug_assertions) {
            "fitpulse-dev.db"
        } else {
            "fitpulse.db"
        };

        Self {
            data_dir,
            db_filename: db_filename.to_string(),
            streak_sweep_cron: "0 0 0 * * *".to_string(),
            reminder_cron: "0 0 20 * * *".to_string(),
            lifecycle_cron: "0 5 0 * * *".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("FITPULSE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(file) = std::env::var("FITPULSE_DB_FILE") {
            config.db_filename = file;
        }
        if let Ok(cron) = std::env::var("FITPULSE_STREAK_SWEEP_CRON") {
            config.streak_sweep_cron = cron;
        }
        if let Ok(cron) = std::env::var("FITPULSE_REMINDER_CRON") {
            config.reminder_cron = cron;
        }
        if let Ok(cron) = std::env::var("FITPULSE_LIFECYCLE_CRON") {
            config.lifecycle_cron = cron;
        }

        config
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_filename)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cron_schedules() {
        let config = EngineConfig::default();
        assert_eq!(config.streak_sweep_cron, "0 0 0 * * *");
        assert_eq!(config.reminder_cron, "0 0 20 * * *");
        assert_eq!(config.lifecycle_cron, "0 5 0 * * *");
    }

    #[test]
    fn test_db_path_is_under_data_dir() {
        let config = EngineConfig::default();
        assert!(config.db_path().starts_with(&config.data_dir));
        assert!(config.log_dir().starts_with(&config.data_dir));
    }
}

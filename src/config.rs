//! Runtime configuration

use std::path::PathBuf;

/// Member file used when nothing else is configured
pub const DEFAULT_DATA_FILE: &str = "BKCustomers.dat";

/// Log filter used when nothing else is configured
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Club registry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClubConfig {
    /// Member file to load at startup and save on exit
    pub data_file: PathBuf,
    /// `tracing_subscriber::EnvFilter` directive string
    pub log_filter: String,
}

impl Default for ClubConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ClubConfig {
    /// Read `CLUB_DATA_FILE` and `CLUB_LOG`, falling back to the defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            data_file: lookup("CLUB_DATA_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE)),
            log_filter: lookup("CLUB_LOG")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    pub fn with_data_file(mut self, data_file: impl Into<PathBuf>) -> Self {
        self.data_file = data_file.into();
        self
    }

    pub fn with_log_filter(mut self, log_filter: impl Into<String>) -> Self {
        self.log_filter = log_filter.into();
        self
    }
}

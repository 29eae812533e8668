use crate::config::SchedulerConfig;
use crate::db::SchedulerDb;
use crate::session::SessionStore;
use serde::Serialize;
use std::time::Duration;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
}

/// A message shown to the user after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }
}

/// State shared by all HTTP handlers.
pub struct AppState {
    pub db: SchedulerDb,
    pub sessions: SessionStore,
    pub config: SchedulerConfig,
}

impl AppState {
    pub fn new(db: SchedulerDb, config: SchedulerConfig) -> Self {
        Self {
            db,
            sessions: SessionStore::new(Duration::from_secs(config.session_ttl_secs)),
            config,
        }
    }
}

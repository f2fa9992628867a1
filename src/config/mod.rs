use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub store: StoreConfig,
    pub tables: TablesConfig,
    pub notifications: NotificationsConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

// Настройки удалённого хранилища (PostgREST)
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
    pub poll_interval_ms: u64,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// Имена таблиц
#[derive(Debug, Clone, Deserialize)]
pub struct TablesConfig {
    pub events: String,
    pub task_assignments: String,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            events: "events".to_string(),
            task_assignments: "task_assignments".to_string(),
        }
    }
}

// Уведомления о непрочитанных задачах
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Пользователь, для которого сервер держит живой счётчик задач.
    pub dashboard_user_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0"),
                port: parse_or("PORT", 8000)?,
                environment: var_or("ENVIRONMENT", "development"),
                rust_log: var_or("RUST_LOG", "studio_desk=debug,tower_http=debug"),
            },
            store: StoreConfig {
                url: required("STORE_URL")?.trim_end_matches('/').to_string(),
                api_key: required("STORE_API_KEY")?,
                timeout_seconds: parse_or("STORE_TIMEOUT_SECONDS", 30)?,
                poll_interval_ms: parse_or("STORE_POLL_INTERVAL_MS", 5000)?,
            },
            tables: TablesConfig {
                events: var_or("EVENTS_TABLE", "events"),
                task_assignments: var_or("TASK_ASSIGNMENTS_TABLE", "task_assignments"),
            },
            notifications: NotificationsConfig {
                dashboard_user_id: env::var("DASHBOARD_USER_ID")
                    .ok()
                    .filter(|id| !id.trim().is_empty()),
            },
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_and_rejects_garbage() {
        // Уникальные ключи, чтобы не пересекаться с другими тестами
        assert_eq!(parse_or::<u64>("STUDIO_DESK_TEST_UNSET", 7).unwrap(), 7);

        env::set_var("STUDIO_DESK_TEST_BAD_PORT", "eighty");
        let err = parse_or::<u16>("STUDIO_DESK_TEST_BAD_PORT", 8000).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "STUDIO_DESK_TEST_BAD_PORT", .. }));
    }

    #[test]
    fn required_reports_missing_key() {
        let err = required("STUDIO_DESK_TEST_MISSING").unwrap_err();
        assert_eq!(err.to_string(), "STUDIO_DESK_TEST_MISSING must be set");
    }
}

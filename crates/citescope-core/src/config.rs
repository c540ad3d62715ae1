use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a map.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("CITESCOPE_ENV", "development"))?;
    let log_level = or_default("CITESCOPE_LOG_LEVEL", "info");
    let tuning_path = optional("CITESCOPE_TUNING_PATH").map(PathBuf::from);
    let projects_path = PathBuf::from(or_default(
        "CITESCOPE_PROJECTS_PATH",
        "./config/projects.yaml",
    ));

    let ai_api_key = optional("CITESCOPE_AI_API_KEY");
    let ai_base_url = or_default("CITESCOPE_AI_BASE_URL", "https://api.openai.com/v1");
    let ai_model = or_default("CITESCOPE_AI_MODEL", "gpt-4o-mini");
    let ai_timeout_secs = parse_u64("CITESCOPE_AI_TIMEOUT_SECS", "60")?;
    let ai_batch_size = parse_usize("CITESCOPE_AI_BATCH_SIZE", "5")?;
    if ai_batch_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "CITESCOPE_AI_BATCH_SIZE".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let ai_batch_delay_ms = parse_u64("CITESCOPE_AI_BATCH_DELAY_MS", "1000")?;
    let ai_max_retries = parse_u32("CITESCOPE_AI_MAX_RETRIES", "2")?;
    let ai_retry_backoff_base_secs = parse_u64("CITESCOPE_AI_RETRY_BACKOFF_BASE_SECS", "1")?;

    let db_max_connections = parse_u32("CITESCOPE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("CITESCOPE_DB_MIN_CONNECTIONS", "1")?;
    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "CITESCOPE_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "min connections ({db_min_connections}) exceeds max connections ({db_max_connections})"
            ),
        });
    }
    let db_acquire_timeout_secs = parse_u64("CITESCOPE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        tuning_path,
        projects_path,
        ai_api_key,
        ai_base_url,
        ai_model,
        ai_timeout_secs,
        ai_batch_size,
        ai_batch_delay_ms,
        ai_max_retries,
        ai_retry_backoff_base_secs,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CITESCOPE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

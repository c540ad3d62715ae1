use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Only the commands that touch persisted runs need a database.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub tuning_path: Option<PathBuf>,
    /// Project definitions seeded by `db seed`.
    pub projects_path: PathBuf,
    /// Absent key disables the AI-powered analyzer.
    pub ai_api_key: Option<String>,
    pub ai_base_url: String,
    pub ai_model: String,
    pub ai_timeout_secs: u64,
    pub ai_batch_size: usize,
    pub ai_batch_delay_ms: u64,
    pub ai_max_retries: u32,
    pub ai_retry_backoff_base_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("tuning_path", &self.tuning_path)
            .field("projects_path", &self.projects_path)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "[redacted]"))
            .field("ai_base_url", &self.ai_base_url)
            .field("ai_model", &self.ai_model)
            .field("ai_timeout_secs", &self.ai_timeout_secs)
            .field("ai_batch_size", &self.ai_batch_size)
            .field("ai_batch_delay_ms", &self.ai_batch_delay_ms)
            .field("ai_max_retries", &self.ai_max_retries)
            .field(
                "ai_retry_backoff_base_secs",
                &self.ai_retry_backoff_base_secs,
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}

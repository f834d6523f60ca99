use std::path::PathBuf;

/// Server configuration — all configuration for the marketplace node
///
/// # Environment variables
///
/// Every item can be overridden through the environment:
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | WORK_DIR | /var/lib/agrimarket | Working directory (database, logs) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | MARKETPLACE_SERVICE_URL | (unset) | External marketplace catalog, publish disabled when unset |
/// | DEFAULT_VALIDITY_DAYS | 30 | Listing validity window when the caller requests none |
/// | ENVIRONMENT | development | Runtime environment |
/// | LOG_LEVEL | info | tracing filter level |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/agrimarket HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding the database and log files
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// External marketplace catalog service (cross-service publish path)
    pub marketplace_service_url: Option<String>,
    /// Validity window applied when the caller requests none
    pub default_validity_days: i64,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Log level passed to the tracing subscriber
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/agrimarket".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            marketplace_service_url: std::env::var("MARKETPLACE_SERVICE_URL").ok(),
            default_validity_days: std::env::var("DEFAULT_VALIDITY_DAYS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(shared::listing::expiry::DEFAULT_VALIDITY_DAYS),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
        }
    }

    /// Directory holding the embedded database
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// Directory holding rolling log files
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// Ensure the working directory structure exists
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        // from_env falls back to defaults for unset variables
        let config = Config::from_env();
        assert!(config.http_port > 0);
        assert!(config.default_validity_days >= 1);
        assert!(config.database_dir().ends_with("database"));
    }
}

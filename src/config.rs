use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| validate_database_url(&url).map(|_| url))?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a positive number"))
                .and_then(|n: u32| {
                    if n == 0 {
                        anyhow::bail!("DB_MAX_CONNECTIONS must be at least 1");
                    }
                    Ok(n)
                })?,
        };

        // Log successful configuration load (without credentials)
        tracing::debug!("Database URL: {}...", url_preview(&config.database_url));
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!("Max DB connections: {}", config.max_connections);

        Ok(config)
    }
}

/// First 20 characters of a connection string, cut on a char boundary.
fn url_preview(url: &str) -> String {
    url.chars().take(20).collect()
}

/// Only PostgreSQL connection strings are accepted.
pub fn validate_database_url(url: &str) -> anyhow::Result<()> {
    if url.trim().is_empty() {
        anyhow::bail!("DB_URL cannot be empty");
    }
    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_scheme() {
        assert!(validate_database_url("postgres://localhost/reviews").is_ok());
        assert!(validate_database_url("postgresql://u:p@db:5432/reviews").is_ok());
        assert!(validate_database_url("mysql://localhost/reviews").is_err());
        assert!(validate_database_url("   ").is_err());
    }

    #[test]
    fn test_url_preview_respects_multibyte_chars() {
        // Byte 20 falls inside the fifth 'ñ'.
        let url = "postgres://ñññññññññññ@db/reviews";
        assert!(!url.is_char_boundary(20));
        assert_eq!(url_preview(url), "postgres://ñññññññññ");
        assert_eq!(url_preview("postgres://x"), "postgres://x");
    }
}

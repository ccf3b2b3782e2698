//! Configuración de base de datos
//!
//! Este módulo maneja la conexión y configuración de PostgreSQL con SQLx.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::env;
use std::time::Duration;

/// Configuración de la base de datos
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    /// Límite de cada sentencia; al vencer la llamada falla con `Timeout`
    pub statement_timeout: Duration,
}

impl DatabaseConfig {
    /// Leer la configuración del entorno
    ///
    /// Usa `DATABASE_URL` si existe; si no, arma la URL con `DB_HOST`,
    /// `DB_PORT`, `DB_NAME`, `DB_USER` y `DB_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
                let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
                let name = env::var("DB_NAME").unwrap_or_else(|_| "loads_db".to_string());
                let user = env::var("DB_USER")
                    .context("DB_USER must be set when DATABASE_URL is absent")?;
                let password = env::var("DB_PASSWORD")
                    .context("DB_PASSWORD must be set when DATABASE_URL is absent")?;
                build_url(&host, &port, &name, &user, &password)
            }
        };

        Ok(Self {
            url,
            max_connections: parse_var("DB_MAX_CONNECTIONS", 10)?,
            min_connections: parse_var("DB_MIN_CONNECTIONS", 1)?,
            connect_timeout: Duration::from_secs(parse_var("DB_CONNECT_TIMEOUT_SECS", 30)?),
            statement_timeout: Duration::from_secs(parse_var("DB_STATEMENT_TIMEOUT_SECS", 5)?),
            ..Self::with_url(String::new())
        })
    }

    /// Valores por defecto para una URL dada
    pub fn with_url(url: String) -> Self {
        Self {
            url,
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(3600),
            statement_timeout: Duration::from_secs(5),
        }
    }

    /// Crear un nuevo pool de conexiones
    pub async fn create_pool(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .connect(&self.url)
            .await
    }

    /// Crear un pool de conexiones para testing
    pub async fn create_test_pool(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(60))
            .max_lifetime(Duration::from_secs(300))
            .connect(&self.url)
            .await
    }
}

fn build_url(host: &str, port: &str, name: &str, user: &str, password: &str) -> String {
    format!("postgres://{}:{}@{}:{}/{}", user, password, host, port, name)
}

/// Leer una variable numérica con valor por defecto
pub(crate) fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        assert_eq!(
            build_url("db", "5433", "loads_db", "olvr", "secret"),
            "postgres://olvr:secret@db:5433/loads_db"
        );
    }

    #[test]
    fn test_with_url_defaults() {
        let config = DatabaseConfig::with_url("postgres://localhost/loads_db".to_string());
        assert!(config.max_connections >= config.min_connections);
        assert_eq!(config.statement_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_var_default_and_error() {
        assert_eq!(parse_var::<u32>("LOADS_TRACKER_TEST_UNSET_VAR", 7).unwrap(), 7);

        env::set_var("LOADS_TRACKER_TEST_BAD_NUMBER", "ten");
        let err = parse_var::<u32>("LOADS_TRACKER_TEST_BAD_NUMBER", 1).unwrap_err();
        assert!(err.to_string().contains("LOADS_TRACKER_TEST_BAD_NUMBER"));
        env::remove_var("LOADS_TRACKER_TEST_BAD_NUMBER");
    }
}

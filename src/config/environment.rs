//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del servidor HTTP y del monitor de cargas.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use super::database::parse_var;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub cors_origins: Vec<String>,
    /// Espera fija antes de responder `/s3/driver` (fuerza bruta)
    pub driver_lookup_delay: Duration,
    /// Antigüedad de `last_update` a partir de la cual una carga está vencida
    pub stale_after: Duration,
    pub stale_check_interval: Duration,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            debug: false,
            cors_origins: vec!["http://localhost:8000".to_string()],
            driver_lookup_delay: Duration::from_millis(2000),
            stale_after: Duration::from_secs(4 * 3600),
            stale_check_interval: Duration::from_secs(4 * 3600),
        }
    }
}

impl EnvironmentConfig {
    /// Leer la configuración del entorno; lo ausente toma el valor por defecto
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let debug = match env::var("DEBUG") {
            Ok(raw) => parse_flag(&raw)
                .with_context(|| format!("DEBUG must be true or false, got '{}'", raw))?,
            Err(_) => defaults.debug,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| split_origins(&raw))
            .unwrap_or(defaults.cors_origins);

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            debug,
            cors_origins,
            driver_lookup_delay: Duration::from_millis(parse_var("DRIVER_LOOKUP_DELAY_MS", 2000)?),
            stale_after: Duration::from_secs(parse_var::<u64>("STALE_AFTER_HOURS", 4)? * 3600),
            stale_check_interval: Duration::from_secs(parse_var(
                "STALE_CHECK_INTERVAL_SECS",
                defaults.stale_check_interval.as_secs(),
            )?),
        })
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

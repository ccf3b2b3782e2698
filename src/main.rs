use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use loads_tracker::api::create_api_router;
use loads_tracker::config::{DatabaseConfig, EnvironmentConfig};
use loads_tracker::database::DatabaseConnection;
use loads_tracker::repositories::{LoadRepository, LoadStore};
use loads_tracker::services::{StalenessMonitor, StalenessPolicy};
use loads_tracker::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    let config = EnvironmentConfig::from_env().context("invalid server configuration")?;

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(if config.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    info!("🚚 Loads Tracker - motor de cargas");
    info!("================================================");

    // Inicializar base de datos
    let db_config = DatabaseConfig::from_env().context("invalid database configuration")?;
    let db_connection = match DatabaseConnection::connect(&db_config).await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {:#}", e);
            return Err(e);
        }
    };

    let repository = LoadRepository::new(db_connection.pool().clone())
        .with_statement_timeout(db_config.statement_timeout);
    repository
        .init_schema_if_absent()
        .await
        .context("cannot initialize the loads schema")?;
    info!("✅ Esquema de cargas listo");

    let store: Arc<dyn LoadStore> = Arc::new(repository);

    // Monitor de cargas vencidas
    let monitor = StalenessMonitor::new(
        store.clone(),
        StalenessPolicy::with_stale_after(config.stale_after),
        config.stale_check_interval,
    )
    .spawn();

    let addr: SocketAddr = config
        .server_url()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_url()))?;

    let app = create_api_router(AppState::new(store, config));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /s3/loads - Cargas activas (vista pública)");
    info!("   GET  /s3/driver?load_id=..&auth_num=.. - Conductor de una carga");
    info!("   GET  /health - Estado y conteo de cargas");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
    }

    monitor.abort();
    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("⚠️ No se pudo instalar el manejador de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("⚠️ No se pudo instalar el manejador de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}

//! API pública de cargas
//!
//! Endpoints de solo lectura para la web: la lista de cargas activas (sin
//! datos de contacto) y la consulta del conductor, protegida por el teléfono
//! del cliente.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::models::SafeLoad;
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::phone::mask_phone;

/// Parámetros de `GET /s3/driver`
#[derive(Debug, Deserialize)]
pub struct DriverQuery {
    pub load_id: String,
    pub auth_num: String,
}

/// Crear router de cargas
pub fn create_loads_router() -> Router<AppState> {
    Router::new()
        .route("/s3/loads", get(get_loads))
        .route("/s3/driver", get(get_driver))
        .route("/health", get(health_check))
}

fn envelope(status: &str, workload: Value) -> Value {
    json!({
        "status": status,
        "message": null,
        "workload": workload,
    })
}

/// GET /s3/loads - Cargas activas en su vista pública
pub async fn get_loads(State(state): State<AppState>) -> AppResult<Json<Value>> {
    info!("📋 Consultando cargas activas");

    let loads: Vec<SafeLoad> = state
        .store
        .get_active()
        .await?
        .iter()
        .map(|load| load.safe_view())
        .collect();

    info!("✅ {} cargas activas", loads.len());
    Ok(Json(envelope(
        "success",
        json!({ "len": loads.len(), "loads": loads }),
    )))
}

/// GET /s3/driver - Datos del conductor para el cliente de la carga
///
/// La respuesta siempre tarda al menos `driver_lookup_delay`, exista o no
/// la carga.
pub async fn get_driver(
    State(state): State<AppState>,
    Query(query): Query<DriverQuery>,
) -> Result<Response, AppError> {
    info!(
        "🔍 Consulta de conductor para la carga {} (auth {})",
        query.load_id,
        mask_phone(&query.auth_num)
    );

    let (load, _) = tokio::join!(
        state.store.get_by_id(&query.load_id),
        tokio::time::sleep(state.config.driver_lookup_delay)
    );

    let Some(load) = load? else {
        warn!("⚠️ Carga no encontrada: {}", query.load_id);
        return Err(AppError::BadRequest("Wrong load ID".to_string()));
    };
    debug!("📦 Carga encontrada: {}", load.load_id());

    if !load.is_client(&query.auth_num) {
        warn!(
            "🔒 El teléfono {} no es el cliente de la carga {}",
            mask_phone(&query.auth_num),
            load.load_id()
        );
        let body = envelope("client match fail", json!({}));
        return Ok((StatusCode::UNAUTHORIZED, Json(body)).into_response());
    }

    info!("✅ Datos del conductor entregados para la carga {}", load.load_id());
    let body = envelope(
        "success",
        json!({
            "driver_name": load.driver_name(),
            "driver_num": load.driver_num(),
        }),
    );
    Ok(Json(body).into_response())
}

/// GET /health - Estado del servicio y conteo de cargas
pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let (active, historical) = futures::try_join!(
        state.store.count_active(),
        state.store.count_historical()
    )?;

    Ok(Json(json!({
        "status": "ok",
        "loads": {
            "active": active,
            "historical": historical,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

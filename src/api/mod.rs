//! API endpoints
//! 
//! Este módulo contiene los endpoints HTTP del motor de cargas.

pub mod loads;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_middleware_with_origins;
use crate::state::AppState;

/// Crear el router principal de la API
pub fn create_api_router(state: AppState) -> Router {
    let cors = cors_middleware_with_origins(&state.config.cors_origins);
    loads::create_loads_router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Motor de ciclo de vida y persistencia de cargas
//!
//! Modelo de carga validado, repositorio PostgreSQL transaccional, API HTTP
//! de solo lectura y servicios auxiliares (alta desde chat, cargas vencidas).

pub mod api;
pub mod config;
pub mod database;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod utils;

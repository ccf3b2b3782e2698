//! Repositorios
//!
//! Capa de acceso a datos de las cargas: el puerto `LoadStore`, su
//! implementación PostgreSQL y el catálogo de consultas.

pub mod load_repository;
pub mod load_store;
pub mod queries;

pub use load_repository::LoadRepository;
pub use load_store::{InMemoryLoadStore, LoadStore};

//! Puerto de persistencia de cargas
//!
//! Los front-ends (API HTTP, bot) solo hablan con `LoadStore`; la
//! implementación real es `LoadRepository` sobre PostgreSQL y
//! `InMemoryLoadStore` sirve para tests y desarrollo local.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{Load, LoadStage};
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::phone::PHONE_DIGITS;

/// Operaciones que el motor expone a sus colaboradores
#[async_trait]
pub trait LoadStore: Send + Sync {
    /// `Ok(None)` cuando no hay carga con ese id; nunca es un error
    async fn get_by_id(&self, load_id: &str) -> AppResult<Option<Load>>;

    /// Cargas con etapa distinta de `history`, por `last_update` ascendente
    async fn get_active(&self) -> AppResult<Vec<Load>>;

    /// Cargas en `history`, por `last_update` ascendente
    async fn get_historical(&self) -> AppResult<Vec<Load>>;

    async fn count_active(&self) -> AppResult<i64>;

    async fn count_historical(&self) -> AppResult<i64>;

    /// Guardar una carga nueva junto con su cliente y su conductor
    async fn add(&self, load: &Load) -> AppResult<String>;

    /// Persistir la etapa y `last_update` de una carga existente
    async fn update(&self, load: &Load) -> AppResult<String>;

    /// Cambiar la etapa en memoria y persistirla
    async fn change_stage(&self, mut load: Load, new_stage: LoadStage) -> AppResult<Load> {
        load.change_stage(new_stage)?;
        self.update(&load).await?;
        Ok(load)
    }
}

#[derive(Default)]
struct MemoryTables {
    clients: HashMap<String, i32>,
    drivers: HashMap<(String, String), i32>,
    loads: HashMap<String, Load>,
}

/// Implementación en memoria con la misma semántica de errores que PostgreSQL
#[derive(Clone, Default)]
pub struct InMemoryLoadStore {
    tables: Arc<RwLock<MemoryTables>>,
}

impl InMemoryLoadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Crear el store con cargas ya guardadas
    pub async fn with_loads(loads: impl IntoIterator<Item = Load>) -> AppResult<Self> {
        let store = Self::new();
        for load in loads {
            store.add(&load).await?;
        }
        Ok(store)
    }

    /// Id del cliente registrado con ese teléfono normalizado
    pub async fn client_id(&self, phone: &str) -> Option<i32> {
        self.tables.read().await.clients.get(phone).copied()
    }

    async fn partition(&self, active: bool) -> Vec<Load> {
        let tables = self.tables.read().await;
        let mut loads: Vec<Load> = tables
            .loads
            .values()
            .filter(|load| load.is_active() == active)
            .cloned()
            .collect();
        loads.sort_by(|a, b| {
            a.last_update()
                .cmp(&b.last_update())
                .then_with(|| a.load_id().cmp(b.load_id()))
        });
        loads
    }
}

// Igual que el CHECK de clients/drivers: exactamente 12 dígitos
fn check_stored_phone(column: &str, phone: &str) -> AppResult<()> {
    if phone.len() == PHONE_DIGITS && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AppError::Constraint(format!(
            "{} must be exactly {} digits, got {} characters",
            column,
            PHONE_DIGITS,
            phone.chars().count()
        )))
    }
}

fn next_id(len: usize) -> i32 {
    i32::try_from(len).map(|n| n + 1).unwrap_or(i32::MAX)
}

#[async_trait]
impl LoadStore for InMemoryLoadStore {
    async fn get_by_id(&self, load_id: &str) -> AppResult<Option<Load>> {
        Ok(self.tables.read().await.loads.get(load_id).cloned())
    }

    async fn get_active(&self) -> AppResult<Vec<Load>> {
        Ok(self.partition(true).await)
    }

    async fn get_historical(&self) -> AppResult<Vec<Load>> {
        Ok(self.partition(false).await)
    }

    async fn count_active(&self) -> AppResult<i64> {
        Ok(self.partition(true).await.len() as i64)
    }

    async fn count_historical(&self) -> AppResult<i64> {
        Ok(self.partition(false).await.len() as i64)
    }

    async fn add(&self, load: &Load) -> AppResult<String> {
        let mut tables = self.tables.write().await;
        if tables.loads.contains_key(load.load_id()) {
            return Err(AppError::Constraint(format!(
                "load '{}' already exists",
                load.load_id()
            )));
        }
        check_stored_phone("clients.phone_num", load.client_num())?;
        check_stored_phone("drivers.phone_num", load.driver_num())?;

        let next_client = next_id(tables.clients.len());
        tables
            .clients
            .entry(load.client_num().to_string())
            .or_insert(next_client);
        let next_driver = next_id(tables.drivers.len());
        tables
            .drivers
            .entry((load.driver_name().to_string(), load.driver_num().to_string()))
            .or_insert(next_driver);

        tables
            .loads
            .insert(load.load_id().to_string(), load.clone());
        Ok(load.load_id().to_string())
    }

    async fn update(&self, load: &Load) -> AppResult<String> {
        let mut tables = self.tables.write().await;
        match tables.loads.get_mut(load.load_id()) {
            Some(stored) => {
                *stored = load.clone();
                Ok(load.load_id().to_string())
            }
            None => Err(not_found_error("Load", load.load_id())),
        }
    }
}

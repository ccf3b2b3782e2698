//! Repositorio PostgreSQL de cargas
//!
//! Implementa `LoadStore` sobre un pool de conexiones. Los errores de la base
//! se clasifican por SQLSTATE en `Constraint`, `NotFound`, `Timeout` o
//! `Database`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::{Load, LoadStage, LoadType, Stages};
use crate::repositories::load_store::LoadStore;
use crate::repositories::queries;
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::phone::mask_phone;

/// Timeout por defecto de cada sentencia
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fila de la proyección `all_loads`
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LoadRow {
    pub loads_id: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub load_type: String,
    pub client_number: String,
    pub driver_name: String,
    pub driver_phone: String,
    pub current_status: String,
    pub start_city: String,
    pub engage_city: Option<String>,
    pub clear_city: Option<String>,
    pub finish_city: String,
}

impl TryFrom<LoadRow> for Load {
    type Error = AppError;

    fn try_from(row: LoadRow) -> Result<Self, Self::Error> {
        let load_type: LoadType = row
            .load_type
            .parse()
            .map_err(|e| AppError::Internal(format!("load '{}': {}", row.loads_id, e)))?;
        let stage: LoadStage = row
            .current_status
            .parse()
            .map_err(|e| AppError::Internal(format!("load '{}': {}", row.loads_id, e)))?;

        let stages = Stages {
            start: row.start_city,
            engage: row.engage_city,
            drive: None,
            clear: row.clear_city,
            finish: row.finish_city,
        };

        Load::restore(
            row.loads_id.clone(),
            load_type,
            stage,
            stages,
            &row.client_number,
            row.driver_name,
            &row.driver_phone,
            row.created_at,
            row.modified_at,
        )
        .map_err(|e| {
            AppError::Internal(format!("stored load '{}' is invalid: {}", row.loads_id, e))
        })
    }
}

impl From<&Load> for LoadRow {
    fn from(load: &Load) -> Self {
        let stages = load.stages();
        Self {
            loads_id: load.load_id().to_string(),
            created_at: load.created_at(),
            modified_at: load.last_update(),
            load_type: load.load_type().as_str().to_string(),
            client_number: load.client_num().to_string(),
            driver_name: load.driver_name().to_string(),
            driver_phone: load.driver_num().to_string(),
            current_status: load.stage().as_str().to_string(),
            start_city: stages.start.clone(),
            engage_city: stages.engage.clone(),
            clear_city: stages.clear.clone(),
            finish_city: stages.finish.clone(),
        }
    }
}

/// Acceso a PostgreSQL para cargas, clientes y conductores
///
/// Cada llamada toma una conexión del pool y ejecuta sus sentencias en una
/// única transacción: o se confirman todas o ninguna.
#[derive(Clone)]
pub struct LoadRepository {
    pool: PgPool,
    statement_timeout: Duration,
}

impl LoadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }

    pub fn with_statement_timeout(mut self, statement_timeout: Duration) -> Self {
        self.statement_timeout = statement_timeout;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Crear tablas y sembrar etapas/tipos si no existen
    pub async fn init_schema_if_absent(&self) -> AppResult<()> {
        let op = "init schema";
        let mut tx = self.begin(op).await?;
        let result = async {
            self.bounded(op, sqlx::query(queries::SCHEMA_LOCK).execute(&mut *tx))
                .await?;
            for statement in queries::SCHEMA_STATEMENTS {
                self.bounded(op, sqlx::query(statement).execute(&mut *tx))
                    .await?;
            }
            Ok(())
        }
        .await;
        self.finish(op, tx, result).await?;

        info!("🗄️ Esquema de cargas verificado");
        Ok(())
    }

    /// Upsert de cliente; devuelve su id (el mismo para el mismo teléfono)
    ///
    /// El teléfono se escribe tal cual: la base exige 12 dígitos.
    pub async fn upsert_client(&self, phone: Option<&str>) -> AppResult<i32> {
        let op = "upsert client";
        let mut tx = self.begin(op).await?;
        let result = self.upsert_client_in(&mut tx, phone).await;
        self.finish(op, tx, result).await
    }

    /// Upsert de conductor por (nombre, teléfono)
    pub async fn upsert_driver(&self, name: &str, phone: Option<&str>) -> AppResult<i32> {
        let op = "upsert driver";
        let mut tx = self.begin(op).await?;
        let result = self.upsert_driver_in(&mut tx, name, phone).await;
        self.finish(op, tx, result).await
    }

    /// Actualizar etapa y `modified_at` a partir del nombre crudo de la etapa
    ///
    /// Id inexistente -> `NotFound`; etapa desconocida -> `Constraint`.
    pub async fn set_status(
        &self,
        load_id: &str,
        status: &str,
        modified_at: DateTime<Utc>,
    ) -> AppResult<String> {
        let op = format!("update load '{}'", load_id);
        let mut tx = self.begin(&op).await?;
        let result = self
            .bounded(
                &op,
                sqlx::query_scalar::<_, String>(queries::UPDATE_LOAD_STATUS)
                    .bind(modified_at)
                    .bind(status)
                    .bind(load_id)
                    .fetch_optional(&mut *tx),
            )
            .await
            .and_then(|updated| updated.ok_or_else(|| not_found_error("Load", load_id)));
        let updated = self.finish(&op, tx, result).await?;

        info!("🔄 Carga {} -> {}", updated, status);
        Ok(updated)
    }

    async fn upsert_client_in(
        &self,
        conn: &mut PgConnection,
        phone: Option<&str>,
    ) -> AppResult<i32> {
        self.bounded(
            "upsert client",
            sqlx::query_scalar::<_, i32>(queries::UPSERT_CLIENT)
                .bind(phone)
                .fetch_one(&mut *conn),
        )
        .await
    }

    async fn upsert_driver_in(
        &self,
        conn: &mut PgConnection,
        name: &str,
        phone: Option<&str>,
    ) -> AppResult<i32> {
        self.bounded(
            "upsert driver",
            sqlx::query_scalar::<_, i32>(queries::UPSERT_DRIVER)
                .bind(name)
                .bind(phone)
                .fetch_one(&mut *conn),
        )
        .await
    }

    async fn fetch_loads(&self, op: &str, query: &'static str) -> AppResult<Vec<Load>> {
        let rows = self
            .bounded(op, sqlx::query_as::<_, LoadRow>(query).fetch_all(&self.pool))
            .await?;
        debug!("📦 {}: {} filas", op, rows.len());
        rows.into_iter().map(Load::try_from).collect()
    }

    async fn count(&self, op: &str, query: &'static str) -> AppResult<i64> {
        self.bounded(op, sqlx::query_scalar::<_, i64>(query).fetch_one(&self.pool))
            .await
    }

    async fn begin(&self, op: &str) -> AppResult<Transaction<'static, Postgres>> {
        self.bounded(op, self.pool.begin()).await
    }

    /// Commit si todo fue bien; si no, rollback y se devuelve el error original
    async fn finish<T>(
        &self,
        op: &str,
        tx: Transaction<'static, Postgres>,
        result: AppResult<T>,
    ) -> AppResult<T> {
        match result {
            Ok(value) => {
                self.bounded(op, tx.commit()).await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!("⚠️ Rollback fallido en '{}': {}", op, rollback_error);
                }
                debug!("↩️ Rollback de '{}': {}", op, e);
                Err(e)
            }
        }
    }

    /// Ejecutar una sentencia con tiempo límite
    async fn bounded<T, F>(&self, op: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.statement_timeout, fut).await {
            Ok(result) => result.map_err(|e| AppError::from_sqlx(op, e)),
            Err(_) => Err(AppError::Timeout(format!(
                "{}: no answer within {:?}",
                op, self.statement_timeout
            ))),
        }
    }
}

#[async_trait]
impl LoadStore for LoadRepository {
    async fn get_by_id(&self, load_id: &str) -> AppResult<Option<Load>> {
        let op = format!("get load '{}'", load_id);
        let row = self
            .bounded(
                &op,
                sqlx::query_as::<_, LoadRow>(queries::SELECT_LOAD_BY_ID)
                    .bind(load_id)
                    .fetch_optional(&self.pool),
            )
            .await?;
        row.map(Load::try_from).transpose()
    }

    async fn get_active(&self) -> AppResult<Vec<Load>> {
        self.fetch_loads("active loads", queries::SELECT_ACTIVE_LOADS)
            .await
    }

    async fn get_historical(&self) -> AppResult<Vec<Load>> {
        self.fetch_loads("historical loads", queries::SELECT_HISTORICAL_LOADS)
            .await
    }

    async fn count_active(&self) -> AppResult<i64> {
        self.count("count active loads", queries::COUNT_ACTIVE_LOADS)
            .await
    }

    async fn count_historical(&self) -> AppResult<i64> {
        self.count("count historical loads", queries::COUNT_HISTORICAL_LOADS)
            .await
    }

    async fn add(&self, load: &Load) -> AppResult<String> {
        let op = format!("add load '{}'", load.load_id());
        let mut tx = self.begin(&op).await?;
        let result = async {
            let client_id = self
                .upsert_client_in(&mut tx, Some(load.client_num()))
                .await?;
            let driver_id = self
                .upsert_driver_in(&mut tx, load.driver_name(), Some(load.driver_num()))
                .await?;
            let stages = load.stages();

            self.bounded(
                &op,
                sqlx::query_scalar::<_, String>(queries::INSERT_LOAD)
                    .bind(load.load_id())
                    .bind(load.created_at())
                    .bind(load.last_update())
                    .bind(load.load_type().as_str())
                    .bind(client_id)
                    .bind(driver_id)
                    .bind(load.stage().as_str())
                    .bind(&stages.start)
                    .bind(&stages.engage)
                    .bind(&stages.clear)
                    .bind(&stages.finish)
                    .fetch_one(&mut *tx),
            )
            .await
        }
        .await;
        let load_id = self.finish(&op, tx, result).await?;

        info!(
            "✅ Carga {} guardada ({}, {}) cliente {} conductor {}",
            load_id,
            load.load_type(),
            load.stage(),
            mask_phone(load.client_num()),
            mask_phone(load.driver_num())
        );
        Ok(load_id)
    }

    async fn update(&self, load: &Load) -> AppResult<String> {
        self.set_status(load.load_id(), load.stage().as_str(), load.last_update())
            .await
    }
}

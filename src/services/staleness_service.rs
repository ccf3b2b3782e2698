//! Monitor de cargas vencidas
//!
//! En horario laboral revisa periódicamente las cargas activas y avisa de
//! las que llevan demasiado tiempo sin actualizarse.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc, Weekday};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::models::Load;
use crate::repositories::LoadStore;
use crate::utils::errors::AppResult;

/// Cuándo y a partir de qué antigüedad una carga activa está vencida
#[derive(Debug, Clone)]
pub struct StalenessPolicy {
    pub business_days: Vec<Weekday>,
    /// Horas laborales, `start <= hora < end`
    pub start_hour: u32,
    pub end_hour: u32,
    pub stale_after: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            business_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            start_hour: 9,
            end_hour: 18,
            stale_after: Duration::from_secs(4 * 3600),
        }
    }
}

impl StalenessPolicy {
    pub fn with_stale_after(stale_after: Duration) -> Self {
        Self {
            stale_after,
            ..Self::default()
        }
    }

    pub fn is_business_time<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.business_days.contains(&now.weekday())
            && (self.start_hour..self.end_hour).contains(&now.hour())
    }

    /// ¿Pasó al menos `stale_after` entre la última actualización y `now`?
    ///
    /// Se compara el valor absoluto: un reloj adelantado también cuenta.
    pub fn is_expired(&self, load: &Load, now: DateTime<Utc>) -> bool {
        let last_update = load.last_update();
        let elapsed = if now >= last_update {
            now - last_update
        } else {
            last_update - now
        };
        elapsed
            .to_std()
            .map(|elapsed| elapsed >= self.stale_after)
            .unwrap_or(true)
    }

    /// Cargas cuyo `last_update` ya venció, en el orden recibido
    pub fn expired_loads<'a>(&self, loads: &'a [Load], now: DateTime<Utc>) -> Vec<&'a Load> {
        loads
            .iter()
            .filter(|load| self.is_expired(load, now))
            .collect()
    }
}

/// Tarea en segundo plano que revisa las cargas activas
pub struct StalenessMonitor {
    store: Arc<dyn LoadStore>,
    policy: StalenessPolicy,
    interval: Duration,
}

impl StalenessMonitor {
    pub fn new(store: Arc<dyn LoadStore>, policy: StalenessPolicy, interval: Duration) -> Self {
        Self {
            store,
            policy,
            interval,
        }
    }

    /// Una pasada: devuelve los ids de las cargas vencidas
    pub async fn check_once(&self, now: DateTime<Utc>) -> AppResult<Vec<String>> {
        let active = self.store.get_active().await?;
        let expired: Vec<String> = self
            .policy
            .expired_loads(&active, now)
            .into_iter()
            .map(|load| load.load_id().to_string())
            .collect();

        if expired.is_empty() {
            debug!("✅ {} cargas activas al día", active.len());
        } else {
            for load_id in &expired {
                warn!("⏰ Carga {} sin actualizar: actualizar ahora", load_id);
            }
        }
        Ok(expired)
    }

    /// Arrancar el bucle; los errores se registran y el bucle sigue
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            "⏱️ Monitor de cargas vencidas cada {:?} (umbral {:?})",
            self.interval, self.policy.stale_after
        );
        tokio::spawn(async move {
            loop {
                if self.policy.is_business_time(&Local::now()) {
                    if let Err(e) = self.check_once(Utc::now()).await {
                        error!("❌ Error revisando cargas vencidas: {}", e);
                    }
                } else {
                    debug!("🌙 Fuera de horario laboral, no se revisan cargas");
                }
                tokio::time::sleep(self.interval).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoadStage, LoadType, NewLoad, Stages};
    use crate::repositories::InMemoryLoadStore;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn load_updated_at(stage: LoadStage, last_update: DateTime<Utc>) -> Load {
        Load::new(NewLoad {
            load_type: LoadType::Internal,
            stage,
            stages: Stages::two_city("Dnipro", "Konotop"),
            client_num: "380953459607".to_string(),
            driver_name: "Hryhorii".to_string(),
            driver_num: "380501231212".to_string(),
            load_id: None,
            last_update: Some(last_update),
        })
        .unwrap()
    }

    #[test]
    fn test_business_time() {
        let policy = StalenessPolicy::default();
        // 2024-03-04 es lunes
        assert!(policy.is_business_time(&at(2024, 3, 4, 9, 0)));
        assert!(policy.is_business_time(&at(2024, 3, 8, 17, 59)));
        assert!(!policy.is_business_time(&at(2024, 3, 4, 18, 0)));
        assert!(!policy.is_business_time(&at(2024, 3, 4, 8, 59)));
        assert!(!policy.is_business_time(&at(2024, 3, 9, 12, 0)));
    }

    #[test]
    fn test_expired_boundary_is_inclusive() {
        let policy = StalenessPolicy::with_stale_after(Duration::from_secs(4 * 3600));
        let now = at(2024, 3, 4, 14, 0);
        let loads = vec![
            load_updated_at(LoadStage::Drive, at(2024, 3, 4, 10, 0)),
            load_updated_at(LoadStage::Drive, at(2024, 3, 4, 10, 1)),
            load_updated_at(LoadStage::Drive, at(2024, 3, 4, 18, 0)),
        ];

        let expired = policy.expired_loads(&loads, now);
        assert_eq!(expired.len(), 2);
        assert_eq!(expired[0].load_id(), loads[0].load_id());
        assert_eq!(expired[1].load_id(), loads[2].load_id());
    }

    #[tokio::test]
    async fn test_check_once_only_looks_at_active_loads() {
        let old = at(2024, 3, 4, 6, 0);
        let stale = load_updated_at(LoadStage::Drive, old);
        let store = InMemoryLoadStore::with_loads([
            stale.clone(),
            load_updated_at(LoadStage::History, old),
            load_updated_at(LoadStage::Start, at(2024, 3, 4, 13, 0)),
        ])
        .await
        .unwrap();

        let monitor = StalenessMonitor::new(
            Arc::new(store),
            StalenessPolicy::default(),
            Duration::from_secs(60),
        );
        let expired = monitor.check_once(at(2024, 3, 4, 14, 0)).await.unwrap();
        assert_eq!(expired, vec![stale.load_id().to_string()]);
    }
}

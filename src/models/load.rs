//! Modelo de Load
//!
//! Una carga es un envío con una ruta y una etapa actual. El tipo, la ruta y
//! los contactos no cambian después de crearla; solo `stage` y `last_update`
//! son mutables, y siempre a través de [`Load::change_stage`].

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::models::stage::{can_transition, LoadStage, LoadType};
use crate::utils::phone::{normalize_phone, same_phone};
use crate::utils::validation::{
    single_field_error, stage_violation, validate_load_id, validate_not_empty,
    validate_phone_digits,
};

/// Ruta de la carga: cada punto es una ciudad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Stages {
    #[validate(custom = "validate_not_empty")]
    pub start: String,
    #[serde(default)]
    pub engage: Option<String>,
    /// Reservado, no se persiste
    #[serde(default)]
    pub drive: Option<String>,
    #[serde(default)]
    pub clear: Option<String>,
    #[validate(custom = "validate_not_empty")]
    pub finish: String,
}

impl Stages {
    /// Ruta de dos ciudades (cargas internas)
    pub fn two_city(start: impl Into<String>, finish: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            engage: None,
            drive: None,
            clear: None,
            finish: finish.into(),
        }
    }

    /// Ruta completa de cinco puntos (cargas externas)
    pub fn full(
        start: impl Into<String>,
        engage: impl Into<String>,
        clear: impl Into<String>,
        finish: impl Into<String>,
    ) -> Self {
        Self {
            start: start.into(),
            engage: Some(engage.into()),
            drive: None,
            clear: Some(clear.into()),
            finish: finish.into(),
        }
    }
}

/// Datos crudos para crear una carga (teléfonos sin normalizar)
#[derive(Debug, Clone, Deserialize)]
pub struct NewLoad {
    #[serde(rename = "type")]
    pub load_type: LoadType,
    pub stage: LoadStage,
    pub stages: Stages,
    pub client_num: String,
    pub driver_name: String,
    pub driver_num: String,
    /// Se genera si no viene
    #[serde(default, rename = "id")]
    pub load_id: Option<String>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

/// Carga validada
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct Load {
    #[serde(rename = "id")]
    #[validate(custom = "validate_load_id")]
    load_id: String,
    #[serde(rename = "type")]
    load_type: LoadType,
    stage: LoadStage,
    #[validate]
    stages: Stages,
    #[validate(custom = "validate_phone_digits")]
    client_num: String,
    driver_name: String,
    #[validate(custom = "validate_phone_digits")]
    driver_num: String,
    created_at: DateTime<Utc>,
    last_update: DateTime<Utc>,
}

/// Vista pública de la carga, sin datos de contacto
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafeLoad {
    #[serde(rename = "id")]
    pub load_id: String,
    #[serde(rename = "type")]
    pub load_type: LoadType,
    pub stage: LoadStage,
    pub stages: Stages,
    pub last_update: DateTime<Utc>,
}

/// Nuevo identificador: UUID v4 sin guiones (32 hex)
pub fn generate_load_id() -> String {
    Uuid::new_v4().simple().to_string()
}

// PostgreSQL guarda microsegundos; truncar evita diferencias al releer
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_micros();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

impl Load {
    /// Crear y validar una carga a partir de datos crudos
    pub fn new(new_load: NewLoad) -> Result<Self, ValidationErrors> {
        let last_update = new_load
            .last_update
            .map(|ts| ts.trunc_subsecs(6))
            .unwrap_or_else(now_micros);

        Self::restore(
            new_load.load_id.unwrap_or_else(generate_load_id),
            new_load.load_type,
            new_load.stage,
            new_load.stages,
            &new_load.client_num,
            new_load.driver_name,
            &new_load.driver_num,
            last_update,
            last_update,
        )
    }

    /// Reconstruir una carga existente (p. ej. desde una fila de la base)
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        load_id: String,
        load_type: LoadType,
        stage: LoadStage,
        stages: Stages,
        client_num: &str,
        driver_name: String,
        driver_num: &str,
        created_at: DateTime<Utc>,
        last_update: DateTime<Utc>,
    ) -> Result<Self, ValidationErrors> {
        let load = Self {
            load_id,
            load_type,
            stage,
            stages,
            client_num: normalize_phone(client_num),
            driver_name,
            driver_num: normalize_phone(driver_num),
            created_at,
            last_update,
        };
        load.check()?;
        Ok(load)
    }

    fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if !self.load_type.allows(self.stage) {
            errors.add(
                "stage",
                stage_violation(self.load_type.as_str(), self.stage.as_str()),
            );
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Cambiar de etapa y actualizar `last_update`
    ///
    /// Se vuelve a comprobar que la etapa sea legal para el tipo de carga; si
    /// no lo es, la carga no se modifica.
    pub fn change_stage(&mut self, new_stage: LoadStage) -> Result<(), ValidationErrors> {
        if !can_transition(self.load_type, self.stage, new_stage) {
            return Err(single_field_error(
                "stage",
                stage_violation(self.load_type.as_str(), new_stage.as_str()),
            ));
        }
        self.stage = new_stage;
        self.last_update = next_timestamp(self.last_update);
        Ok(())
    }

    /// Proyección sin `client_num`, `driver_num` ni `driver_name`
    pub fn safe_view(&self) -> SafeLoad {
        SafeLoad {
            load_id: self.load_id.clone(),
            load_type: self.load_type,
            stage: self.stage,
            stages: self.stages.clone(),
            last_update: self.last_update,
        }
    }

    /// ¿Coincide `raw_phone` con el teléfono del cliente?
    pub fn is_client(&self, raw_phone: &str) -> bool {
        same_phone(&self.client_num, raw_phone)
    }

    pub fn is_external(&self) -> bool {
        self.load_type == LoadType::External
    }

    pub fn is_active(&self) -> bool {
        self.stage.is_active()
    }

    pub fn load_id(&self) -> &str {
        &self.load_id
    }

    pub fn load_type(&self) -> LoadType {
        self.load_type
    }

    pub fn stage(&self) -> LoadStage {
        self.stage
    }

    pub fn stages(&self) -> &Stages {
        &self.stages
    }

    pub fn client_num(&self) -> &str {
        &self.client_num
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn driver_num(&self) -> &str {
        &self.driver_num
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::failed_fields;

    fn external(stage: LoadStage) -> NewLoad {
        NewLoad {
            load_type: LoadType::External,
            stage,
            stages: Stages::full("Poltava", "Kyiv", "Plzen", "Warsaw"),
            client_num: "+380 95 123-45-67".to_string(),
            driver_name: "Taras".to_string(),
            driver_num: "+380 63 777-66-33".to_string(),
            load_id: None,
            last_update: None,
        }
    }

    fn internal(stage: LoadStage) -> NewLoad {
        NewLoad {
            load_type: LoadType::Internal,
            stages: Stages::two_city("Poltava", "Kyiv"),
            ..external(stage)
        }
    }

    #[test]
    fn test_external_accepts_every_stage() {
        for stage in LoadStage::ALL {
            let load = Load::new(external(stage)).unwrap();
            assert_eq!(load.stage(), stage);
            assert!(load.is_external());
        }
    }

    #[test]
    fn test_internal_rejects_engage_and_clear() {
        for stage in [LoadStage::Engage, LoadStage::Clear] {
            let errors = Load::new(internal(stage)).unwrap_err();
            assert_eq!(failed_fields(&errors), vec!["stage".to_string()]);
        }
        for stage in [LoadStage::Start, LoadStage::Drive, LoadStage::Finish, LoadStage::History] {
            assert!(Load::new(internal(stage)).is_ok());
        }
    }

    #[test]
    fn test_construction_normalizes_phones() {
        let load = Load::new(external(LoadStage::Start)).unwrap();
        assert_eq!(load.client_num(), "380951234567");
        assert_eq!(load.driver_num(), "380637776633");
        assert!(load.is_client("380951234567"));
        assert!(load.is_client("+380 (95) 123 45 67"));
        assert!(!load.is_client("380951234568"));
    }

    #[test]
    fn test_generated_id_is_32_hex() {
        let load = Load::new(external(LoadStage::Start)).unwrap();
        assert_eq!(load.load_id().len(), 32);
        assert!(load.load_id().chars().all(|c| c.is_ascii_hexdigit()));

        let other = Load::new(external(LoadStage::Start)).unwrap();
        assert_ne!(load.load_id(), other.load_id());
    }

    #[test]
    fn test_validation_enumerates_every_failed_field() {
        let raw = NewLoad {
            stages: Stages::two_city(" ", ""),
            client_num: "no phone".to_string(),
            driver_num: "---".to_string(),
            load_id: Some("not-an-id".to_string()),
            ..internal(LoadStage::Clear)
        };
        let errors = Load::new(raw).unwrap_err();
        assert_eq!(
            failed_fields(&errors),
            vec![
                "client_num".to_string(),
                "driver_num".to_string(),
                "id".to_string(),
                "stage".to_string(),
                "stages.finish".to_string(),
                "stages.start".to_string(),
            ]
        );
    }

    #[test]
    fn test_explicit_id_and_timestamp_are_kept() {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T10:00:00.123456789Z")
            .unwrap()
            .with_timezone(&Utc);
        let raw = NewLoad {
            load_id: Some("9264575ff59944ebac30d8ffc38280ba".to_string()),
            last_update: Some(ts),
            ..external(LoadStage::Drive)
        };
        let load = Load::new(raw).unwrap();
        assert_eq!(load.load_id(), "9264575ff59944ebac30d8ffc38280ba");
        assert_eq!(load.last_update(), ts.trunc_subsecs(6));
        assert_eq!(load.created_at(), load.last_update());
    }

    #[test]
    fn test_change_stage_moves_last_update_forward() {
        let mut load = Load::new(external(LoadStage::Start)).unwrap();
        let before = load.last_update();

        load.change_stage(LoadStage::Finish).unwrap();
        assert_eq!(load.stage(), LoadStage::Finish);
        assert!(load.last_update() > before);

        let second = load.last_update();
        load.change_stage(LoadStage::Start).unwrap();
        assert!(load.last_update() > second);
    }

    #[test]
    fn test_change_stage_revalidates_internal_loads() {
        let mut load = Load::new(internal(LoadStage::Start)).unwrap();
        let before = load.clone();

        let errors = load.change_stage(LoadStage::Engage).unwrap_err();
        assert_eq!(failed_fields(&errors), vec!["stage".to_string()]);
        assert_eq!(load, before);

        load.change_stage(LoadStage::History).unwrap();
        assert!(!load.is_active());
    }

    #[test]
    fn test_safe_view_hides_contacts() {
        let load = Load::new(external(LoadStage::History)).unwrap();
        let json = serde_json::to_value(load.safe_view()).unwrap();
        let object = json.as_object().unwrap();

        assert!(!object.contains_key("client_num"));
        assert!(!object.contains_key("driver_num"));
        assert!(!object.contains_key("driver_name"));
        assert_eq!(json["id"], load.load_id());
        assert_eq!(json["type"], "external");
        assert_eq!(json["stage"], "history");
        assert_eq!(json["stages"]["engage"], "Kyiv");
    }

    #[test]
    fn test_new_load_from_json() {
        let raw: NewLoad = serde_json::from_value(serde_json::json!({
            "type": "internal",
            "stage": "drive",
            "stages": { "start": "Kryvyi Rih", "finish": "Dnipro" },
            "client_num": "+380 95 345 96 07",
            "driver_name": "Hryhorii",
            "driver_num": "+380 50 123 12 12"
        }))
        .unwrap();
        let load = Load::new(raw).unwrap();
        assert_eq!(load.load_type(), LoadType::Internal);
        assert_eq!(load.stages().engage, None);
        assert_eq!(load.client_num(), "380953459607");
    }
}

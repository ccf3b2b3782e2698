//! Máquina de estados de las cargas
//!
//! Define las etapas de una carga, los tipos de carga y qué etapas son
//! legales para cada tipo. No se impone un orden lineal entre etapas: los
//! operadores pueden corregir un clic equivocado moviendo la carga hacia atrás.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tipo de carga - mapea a la tabla load_types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadType {
    /// Ruta completa de cinco puntos
    External,
    /// Flujo reducido de dos ciudades
    Internal,
}

/// Etapa de la carga - mapea a la tabla load_statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStage {
    Start,
    Engage,
    Drive,
    Clear,
    Finish,
    /// Baja lógica: la carga sale de la partición activa
    History,
}

/// Error al interpretar una etapa o tipo desconocido
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl LoadType {
    pub const ALL: [LoadType; 2] = [LoadType::External, LoadType::Internal];

    pub fn as_str(self) -> &'static str {
        match self {
            LoadType::External => "external",
            LoadType::Internal => "internal",
        }
    }

    /// Etapas legales para este tipo de carga
    pub fn allowed_stages(self) -> &'static [LoadStage] {
        match self {
            LoadType::External => &LoadStage::ALL,
            LoadType::Internal => &[
                LoadStage::Start,
                LoadStage::Drive,
                LoadStage::Finish,
                LoadStage::History,
            ],
        }
    }

    pub fn allows(self, stage: LoadStage) -> bool {
        self.allowed_stages().contains(&stage)
    }
}

impl LoadStage {
    pub const ALL: [LoadStage; 6] = [
        LoadStage::Start,
        LoadStage::Engage,
        LoadStage::Drive,
        LoadStage::Clear,
        LoadStage::Finish,
        LoadStage::History,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LoadStage::Start => "start",
            LoadStage::Engage => "engage",
            LoadStage::Drive => "drive",
            LoadStage::Clear => "clear",
            LoadStage::Finish => "finish",
            LoadStage::History => "history",
        }
    }

    /// `history` es la única etapa fuera de la partición activa
    pub fn is_active(self) -> bool {
        self != LoadStage::History
    }

    pub fn is_terminal(self) -> bool {
        self == LoadStage::History
    }
}

/// ¿Puede una carga de `load_type` pasar de `from` a `to`?
///
/// Solo se comprueba que `to` sea legal para el tipo; cualquier movimiento,
/// incluso hacia atrás o fuera de `history`, está permitido.
pub fn can_transition(load_type: LoadType, _from: LoadStage, to: LoadStage) -> bool {
    load_type.allows(to)
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoadType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "load type",
                value: s.to_string(),
            })
    }
}

impl FromStr for LoadStage {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoadStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "stage",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_allows_every_stage() {
        for stage in LoadStage::ALL {
            assert!(LoadType::External.allows(stage), "{stage} should be legal");
        }
    }

    #[test]
    fn test_internal_rejects_engage_and_clear() {
        assert!(!LoadType::Internal.allows(LoadStage::Engage));
        assert!(!LoadType::Internal.allows(LoadStage::Clear));
        assert!(LoadType::Internal.allows(LoadStage::Start));
        assert!(LoadType::Internal.allows(LoadStage::Drive));
        assert!(LoadType::Internal.allows(LoadStage::Finish));
        assert!(LoadType::Internal.allows(LoadStage::History));
    }

    #[test]
    fn test_backward_moves_are_allowed() {
        assert!(can_transition(LoadType::External, LoadStage::Finish, LoadStage::Start));
        assert!(can_transition(LoadType::Internal, LoadStage::History, LoadStage::Drive));
        assert!(!can_transition(LoadType::Internal, LoadStage::Start, LoadStage::Clear));
    }

    #[test]
    fn test_only_history_is_inactive() {
        let inactive: Vec<_> = LoadStage::ALL.into_iter().filter(|s| !s.is_active()).collect();
        assert_eq!(inactive, vec![LoadStage::History]);
        assert!(LoadStage::History.is_terminal());
        assert!(!LoadStage::Finish.is_terminal());
    }

    #[test]
    fn test_parse_and_display() {
        for stage in LoadStage::ALL {
            assert_eq!(stage.to_string().parse::<LoadStage>(), Ok(stage));
        }
        assert_eq!("internal".parse::<LoadType>(), Ok(LoadType::Internal));

        let err = "wrong_parameter".parse::<LoadStage>().unwrap_err();
        assert_eq!(err.to_string(), "unknown stage 'wrong_parameter'");
        assert!("External".parse::<LoadType>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&LoadStage::History).unwrap(), "\"history\"");
        let load_type: LoadType = serde_json::from_str("\"external\"").unwrap();
        assert_eq!(load_type, LoadType::External);
    }
}

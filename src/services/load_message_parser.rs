//! Parser de mensajes de alta de cargas
//!
//! El operador crea cargas desde el chat con un mensaje de varias líneas.
//! Formato externo (la primera línea es la cabecera):
//!
//! ```text
//! new:external
//! Кривий Ріг
//! Дніпро
//! Чернівці
//! Ясси
//!
//! Козак Григорій
//! +380501231212
//!
//! Client: +380953459607
//! ```
//!
//! El formato interno solo lleva origen y destino, así que el conductor
//! queda en las líneas 4 y 5 y el cliente en la 7.

use thiserror::Error;
use tracing::{debug, warn};
use validator::ValidationErrors;

use crate::models::{Load, LoadStage, LoadType, NewLoad, Stages};
use crate::utils::errors::AppError;
use crate::utils::phone::mask_phone;

pub const EXTERNAL_HEADER: &str = "new:external";
pub const INTERNAL_HEADER: &str = "new:internal";
const CLIENT_PREFIX: &str = "Client:";

#[derive(Error, Debug)]
pub enum LoadMessageParseError {
    #[error("message does not start with 'new:external' or 'new:internal'")]
    UnknownHeader,

    #[error("line {line} ({field}) is missing or blank")]
    MissingField { line: usize, field: &'static str },

    #[error("parsed load is invalid: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl From<LoadMessageParseError> for AppError {
    fn from(e: LoadMessageParseError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

/// Posiciones de cada campo según el tipo de mensaje
struct Layout {
    load_type: LoadType,
    driver_name: usize,
    driver_num: usize,
    client: usize,
}

const EXTERNAL_LAYOUT: Layout = Layout {
    load_type: LoadType::External,
    driver_name: 6,
    driver_num: 7,
    client: 9,
};

const INTERNAL_LAYOUT: Layout = Layout {
    load_type: LoadType::Internal,
    driver_name: 4,
    driver_num: 5,
    client: 7,
};

/// ¿Es un mensaje de alta? Solo mira la cabecera
pub fn is_new_load_message(message: &str) -> bool {
    header_layout(message).is_some()
}

fn header_layout(message: &str) -> Option<&'static Layout> {
    match message.trim_start().lines().next().map(str::trim) {
        Some(EXTERNAL_HEADER) => Some(&EXTERNAL_LAYOUT),
        Some(INTERNAL_HEADER) => Some(&INTERNAL_LAYOUT),
        _ => None,
    }
}

/// Convertir el mensaje en una carga nueva
///
/// La carga nace en `history`: queda oculta hasta que el operador la
/// despacha cambiando su etapa.
pub fn parse_load_message(message: &str) -> Result<Load, LoadMessageParseError> {
    let layout = header_layout(message).ok_or(LoadMessageParseError::UnknownHeader)?;
    let lines: Vec<&str> = message.trim().split('\n').collect();

    let field = |line: usize, name: &'static str| -> Result<String, LoadMessageParseError> {
        lines
            .get(line)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or(LoadMessageParseError::MissingField { line, field: name })
    };

    let stages = match layout.load_type {
        LoadType::External => Stages::full(
            field(1, "start")?,
            field(2, "engage")?,
            field(3, "clear")?,
            field(4, "finish")?,
        ),
        LoadType::Internal => Stages::two_city(field(1, "start")?, field(2, "finish")?),
    };

    let driver_name = field(layout.driver_name, "driver_name")?;
    let driver_num = field(layout.driver_num, "driver_num")?;
    let client_num = field(layout.client, "client_num")?
        .trim_start_matches(CLIENT_PREFIX)
        .trim()
        .to_string();
    if client_num.is_empty() {
        return Err(LoadMessageParseError::MissingField {
            line: layout.client,
            field: "client_num",
        });
    }

    let load = Load::new(NewLoad {
        load_type: layout.load_type,
        stage: LoadStage::History,
        stages,
        client_num,
        driver_name,
        driver_num,
        load_id: None,
        last_update: None,
    })
    .map_err(|e| {
        warn!("⚠️ Mensaje de alta con datos inválidos: {}", e);
        LoadMessageParseError::Invalid(e)
    })?;

    debug!(
        "📝 Carga {} parseada ({}, cliente {})",
        load.load_id(),
        load.load_type(),
        mask_phone(load.client_num())
    );
    Ok(load)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTERNAL: &str = "new:external\n\
        Кривий Ріг\n\
        Дніпро\n\
        Чернівці\n\
        Ясси\n\
        \n\
        Козак Григорій\n\
        +380501231212\n\
        \n\
        Client: +380953459607\n";

    const INTERNAL: &str = "new:internal\n\
        Дніпро\n\
        Конотоп\n\
        \n\
        Козак Григорій\n\
        +380501231212\n\
        \n\
        Client: +380953459607";

    #[test]
    fn test_parse_external() {
        let load = parse_load_message(EXTERNAL).unwrap();
        assert_eq!(load.load_type(), LoadType::External);
        assert_eq!(load.stage(), LoadStage::History);
        assert_eq!(
            load.stages(),
            &Stages::full("Кривий Ріг", "Дніпро", "Чернівці", "Ясси")
        );
        assert_eq!(load.driver_name(), "Козак Григорій");
        assert_eq!(load.driver_num(), "380501231212");
        assert_eq!(load.client_num(), "380953459607");
    }

    #[test]
    fn test_parse_internal() {
        let load = parse_load_message(INTERNAL).unwrap();
        assert_eq!(load.load_type(), LoadType::Internal);
        assert_eq!(load.stages(), &Stages::two_city("Дніпро", "Конотоп"));
        assert_eq!(load.client_num(), "380953459607");
    }

    #[test]
    fn test_unknown_header() {
        assert!(!is_new_load_message("hello\nworld"));
        assert!(matches!(
            parse_load_message("new:pallet\nA\nB"),
            Err(LoadMessageParseError::UnknownHeader)
        ));
    }

    #[test]
    fn test_truncated_message() {
        let truncated: String = EXTERNAL.lines().take(7).collect::<Vec<_>>().join("\n");
        match parse_load_message(&truncated) {
            Err(LoadMessageParseError::MissingField { line, field }) => {
                assert_eq!(line, 7);
                assert_eq!(field, "driver_num");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_blank_city() {
        let message = INTERNAL.replacen("Конотоп", "  ", 1);
        assert!(matches!(
            parse_load_message(&message),
            Err(LoadMessageParseError::MissingField { line: 2, field: "finish" })
        ));
    }

    #[test]
    fn test_empty_client_after_prefix() {
        let message = INTERNAL.replace("Client: +380953459607", "Client:");
        assert!(matches!(
            parse_load_message(&message),
            Err(LoadMessageParseError::MissingField { line: 7, .. })
        ));
    }

    #[test]
    fn test_phone_without_digits_is_invalid() {
        let message = INTERNAL.replace("+380501231212", "no phone");
        let err = parse_load_message(&message).unwrap_err();
        assert!(matches!(err, LoadMessageParseError::Invalid(_)));
        assert!(matches!(AppError::from(err), AppError::BadRequest(_)));
    }
}

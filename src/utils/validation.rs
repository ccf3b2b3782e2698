//! Utilidades de validación
//!
//! Este módulo contiene las reglas de campo que usan los modelos con
//! `#[derive(Validate)]` y helpers para construir errores de validación.

use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors};

/// Longitud del identificador de carga (hex)
pub const LOAD_ID_LEN: usize = 32;

fn error_with_message(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = error_with_message("not_empty", "must not be blank");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar un identificador de carga: 32 caracteres hexadecimales
pub fn validate_load_id(value: &str) -> Result<(), ValidationError> {
    if value.len() != LOAD_ID_LEN || !value.chars().all(|c| c.is_ascii_hexdigit()) {
        let mut error = error_with_message("load_id", "must be 32 hexadecimal characters");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar un teléfono ya normalizado (solo dígitos, no vacío)
pub fn validate_phone_digits(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(error_with_message(
            "phone_empty",
            "must contain at least one digit",
        ));
    }
    if !value.chars().all(|c| c.is_ascii_digit()) {
        let mut error = error_with_message("phone_digits", "must contain digits only");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Crear un `ValidationErrors` con un solo error de campo
pub fn single_field_error(field: &'static str, error: ValidationError) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}

/// Error de etapa ilegal para el tipo de carga
pub fn stage_violation(load_type: &str, stage: &str) -> ValidationError {
    let mut error = error_with_message(
        "stage_not_allowed",
        "internal loads must not have \"engage\" or \"clear\" stage",
    );
    error.add_param("load_type".into(), &load_type);
    error.add_param("stage".into(), &stage);
    error
}

/// Nombres de los campos que fallaron, incluyendo los anidados (`stages.start`)
pub fn failed_fields(errors: &ValidationErrors) -> Vec<String> {
    use validator::ValidationErrorsKind;

    let mut fields = Vec::new();
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(_) => fields.push(field.to_string()),
            ValidationErrorsKind::Struct(nested) => fields.extend(
                failed_fields(nested)
                    .into_iter()
                    .map(|inner| format!("{}.{}", field, inner)),
            ),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    fields.extend(
                        failed_fields(nested)
                            .into_iter()
                            .map(|inner| format!("{}[{}].{}", field, index, inner)),
                    );
                }
            }
        }
    }
    fields.sort();
    fields
}

//! Normalización de teléfonos
//! 
//! Este módulo reduce los números de clientes y conductores a una cadena
//! canónica de dígitos antes de guardarlos o compararlos.

/// Número máximo de dígitos que se conservan
pub const PHONE_DIGITS: usize = 12;

/// Eliminar todo lo que no sea dígito y conservar los primeros [`PHONE_DIGITS`].
///
/// No se valida el prefijo de país: `"+380-95 123-45-67"` y `"380951234567"`
/// son la misma identidad.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit())
        .take(PHONE_DIGITS)
        .collect()
}

/// Comparar dos teléfonos después de normalizarlos
pub fn same_phone(a: &str, b: &str) -> bool {
    normalize_phone(a) == normalize_phone(b)
}

/// Enmascarar el teléfono para logs (solo los últimos 4 dígitos)
pub fn mask_phone(phone: &str) -> String {
    let digits = normalize_phone(phone);
    let visible = digits.len().min(4);
    let (hidden, tail) = digits.split_at(digits.len() - visible);
    format!("{}{}", "*".repeat(hidden.len()), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize_phone("+380-95 123-45-67"), "380951234567");
        assert_eq!(normalize_phone("380951234567"), "380951234567");
        assert_eq!(normalize_phone("(380) 95.123.45.67"), "380951234567");
    }

    #[test]
    fn test_normalize_truncates_long_numbers() {
        assert_eq!(normalize_phone("3809512345678999"), "380951234567");
        assert_eq!(normalize_phone("+380 95 123 45 67 ext 89"), "380951234567");
    }

    #[test]
    fn test_normalize_keeps_short_numbers() {
        assert_eq!(normalize_phone("12-34"), "1234");
        assert_eq!(normalize_phone("no digits"), "");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn test_normalize_ignores_non_ascii_digits() {
        // Solo dígitos ASCII forman parte de la identidad
        assert_eq!(normalize_phone("٣٨٠951234567"), "951234567");
    }

    #[test]
    fn test_same_phone() {
        assert!(same_phone("+380 95 123-45-67", "380951234567"));
        assert!(!same_phone("+380 95 123-45-67", "380951234568"));
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+380 95 123-45-67"), "********4567");
        assert_eq!(mask_phone("12"), "12");
        assert_eq!(mask_phone(""), "");
    }
}

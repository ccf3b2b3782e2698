//! Utilidades del sistema
//! 
//! Este módulo contiene utilidades para manejo de errores, validación
//! y normalización de teléfonos.

pub mod errors;
pub mod phone;
pub mod validation;

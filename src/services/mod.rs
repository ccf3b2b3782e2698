//! Services module
//! 
//! Este módulo contiene la lógica de negocio que no pertenece a un modelo:
//! el alta de cargas desde mensajes de chat y el monitor de cargas vencidas.

pub mod load_message_parser;
pub mod staleness_service;

pub use load_message_parser::{is_new_load_message, parse_load_message, LoadMessageParseError};
pub use staleness_service::{StalenessMonitor, StalenessPolicy};

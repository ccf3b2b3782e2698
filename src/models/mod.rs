//! Modelos del sistema
//! 
//! Este módulo contiene la entidad Load, su ruta y la máquina de estados
//! que decide qué etapas son legales para cada tipo de carga.

pub mod load;
pub mod stage;

pub use load::{Load, NewLoad, SafeLoad, Stages};
pub use stage::{LoadStage, LoadType};

//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod config;
pub mod entities;
pub mod environment;
pub mod error;
pub mod names;

pub use config::{merge_tables, ProjectConfig};
pub use entities::*;
pub use environment::{Environment, NameSource};
pub use error::DomainError;

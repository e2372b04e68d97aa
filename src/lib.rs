//! legend: scaffolding and workflow automation for Azure Functions projects
//!
//! Layers, innermost first: `domain` (pure rules), `application` (services
//! over I/O traits), `infrastructure` (real I/O and wiring), `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

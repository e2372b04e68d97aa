//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, CommandRunner, Prompt)
//! but are themselves concrete structs, not traits.

mod azure;
mod bootstrap;
mod environment;
mod runtime;
mod scaffold;
pub mod tools;

pub use azure::{AzureService, DeployOutcome, DeploymentInfo, FunctionInfo, ProvisionReport, Target};
pub use bootstrap::{BootstrapService, DependencyStatus};
pub use environment::EnvironmentService;
pub use runtime::RuntimeService;
pub use scaffold::{NewFunction, NewProject, NewProjectReport, ScaffoldService};

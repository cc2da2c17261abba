//! helmprobe exec - running helm for tests
//!
//! - `ExecConfig`: executable, timeout and staging directory, read once from the environment
//! - `ProcessExecutor`: timeouts, exit-code policy, stdout/stderr capture
//! - `Stager`: values files and persisted output in the staging directory
//! - `HelmExecutor`: `helm template` / `helm version` for one chart

pub mod config;
pub mod error;
pub mod helm;
pub mod process;
pub mod staging;

pub use config::ExecConfig;
pub use error::{ExecError, Result, persisted_output_path_from_message};
pub use helm::{HelmExecutor, helm_version, parse_version};
pub use process::{CommandOutput, Expect, ProcessExecutor};
pub use staging::Stager;

//! helmprobe core - model and assertions for rendered Helm chart output
//!
//! This crate works on text the templating tool has already produced:
//! - `Manifests`: the rendered documents as typed `k8s-openapi` objects plus raw trees
//! - `Workload`: pod-managing objects and checksum annotation verification
//! - `scraper`: value paths referenced by chart templates
//! - `schema`: leaf value paths declared by `values.schema.json`
//! - `Chart`: chart layout and template/schema value parity

pub mod chart;
pub mod error;
pub mod manifest;
pub mod object;
pub mod schema;
pub mod scraper;
pub mod tree;
pub mod workload;

pub use chart::{Chart, ValueParity};
pub use error::{CoreError, Result};
pub use manifest::Manifests;
pub use object::{KnownObject, RenderedObject, TypedObjectError, TypedResource};
pub use tree::NestedValue;
pub use workload::{ChecksumFinding, ChecksumVerification, ReferencedResources, Workload, WorkloadKind};

//! Workloads and checksum annotation verification
//!
//! Charts commonly annotate pod templates with `checksum/<resource>: <hash>` so
//! that pods are replaced whenever a ConfigMap or Secret they consume changes.
//! [`Workload::verify_checksum_annotations`] cross-references the resources a
//! pod template consumes with the checksum annotations it carries.
//!
//! Matching is by substring: a referenced name is covered by any checksum
//! annotation key containing it. This tolerates prefixes such as
//! `checksum/my-app-config` for ConfigMap `my-app-config`, and it also means a
//! name that is a substring of another name can be covered by that other
//! name's annotation.

use k8s_openapi::api::core::v1::Container;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::object::{RenderedObject, TypedObjectError};
use crate::tree::{NestedValue, object_entries};

/// Annotation keys containing this (case-insensitively) are checksum annotations
const CHECKSUM_MARKER: &str = "checksum";

/// Largest edit distance at which an unknown kind gets a suggestion
const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Kinds that manage pods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    ReplicaSet,
    Job,
    CronJob,
    DaemonSet,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 6] = [
        WorkloadKind::Deployment,
        WorkloadKind::StatefulSet,
        WorkloadKind::ReplicaSet,
        WorkloadKind::Job,
        WorkloadKind::CronJob,
        WorkloadKind::DaemonSet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::ReplicaSet => "ReplicaSet",
            WorkloadKind::Job => "Job",
            WorkloadKind::CronJob => "CronJob",
            WorkloadKind::DaemonSet => "DaemonSet",
        }
    }

    /// Dotted path of the pod template within the raw document
    pub fn pod_template_path(&self) -> &'static str {
        match self {
            WorkloadKind::CronJob => "spec.jobTemplate.spec.template",
            _ => "spec.template",
        }
    }

    /// Resolve `kind`, failing with [`CoreError::UnrecognizedKind`] for anything
    /// outside the workload kinds. `context` names the object being looked up.
    pub fn check(kind: &str, context: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == kind)
            .ok_or_else(|| CoreError::UnrecognizedKind {
                kind: kind.to_string(),
                context: (!context.is_empty()).then(|| context.to_string()),
                suggestion: suggest_kind(kind).map(str::to_string),
            })
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::check(s, "")
    }
}

fn suggest_kind(kind: &str) -> Option<&'static str> {
    let lowered = kind.to_lowercase();
    WorkloadKind::ALL
        .iter()
        .map(|candidate| {
            let distance = strsim::levenshtein(&lowered, &candidate.as_str().to_lowercase());
            (distance, candidate.as_str())
        })
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, name)| name)
}

/// ConfigMap and Secret names consumed by a pod template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferencedResources {
    pub config_maps: BTreeSet<String>,
    pub secrets: BTreeSet<String>,
}

impl ReferencedResources {
    fn all_names(&self) -> impl Iterator<Item = &String> {
        self.config_maps.iter().chain(self.secrets.iter())
    }
}

/// One problem found by checksum annotation verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumFinding {
    MissingConfigMap { workload: String, config_map: String },
    MissingSecret { workload: String, secret: String },
    UnnecessaryAnnotation { workload: String, annotation: String },
}

impl fmt::Display for ChecksumFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumFinding::MissingConfigMap {
                workload,
                config_map,
            } => write!(
                f,
                "Workload '{}' is missing checksum annotation for referenced ConfigMap '{}'.",
                workload, config_map
            ),
            ChecksumFinding::MissingSecret { workload, secret } => write!(
                f,
                "Workload '{}' is missing checksum annotation for referenced Secret '{}'.",
                workload, secret
            ),
            ChecksumFinding::UnnecessaryAnnotation {
                workload,
                annotation,
            } => write!(
                f,
                "Workload '{}' has unnecessary extra checksum annotation '{}'.",
                workload, annotation
            ),
        }
    }
}

/// Outcome of checksum annotation verification
///
/// `message` is empty on success, otherwise every finding's text joined by `\n`:
/// missing ConfigMaps, then missing Secrets, then unnecessary annotations, each
/// group in ascending name order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumVerification {
    pub success: bool,
    pub message: String,
    pub findings: Vec<ChecksumFinding>,
}

impl ChecksumVerification {
    pub fn success() -> Self {
        Self {
            success: true,
            message: String::new(),
            findings: Vec::new(),
        }
    }

    pub fn from_findings(findings: Vec<ChecksumFinding>) -> Self {
        if findings.is_empty() {
            return Self::success();
        }

        let message = findings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            success: false,
            message,
            findings,
        }
    }
}

/// A rendered object of a workload kind
#[derive(Debug, Clone, Copy)]
pub struct Workload<'a> {
    object: &'a RenderedObject,
    kind: WorkloadKind,
}

impl<'a> Workload<'a> {
    /// Wrap `object`, failing if its kind is not a workload kind
    pub fn new(object: &'a RenderedObject) -> Result<Self> {
        let kind = WorkloadKind::check(object.kind(), object.name().unwrap_or_default())?;
        Ok(Self { object, kind })
    }

    pub fn name(&self) -> &'a str {
        self.object.name().unwrap_or_default()
    }

    pub fn kind(&self) -> WorkloadKind {
        self.kind
    }

    pub fn object(&self) -> &'a RenderedObject {
        self.object
    }

    fn pod_template(&self) -> Option<&'a Map<String, JsonValue>> {
        self.object.tree().nested_object(self.kind.pod_template_path())
    }

    fn pod_spec_list(&self, field: &str) -> Option<&'a Vec<JsonValue>> {
        self.pod_template()?.nested_array(&format!("spec.{}", field))
    }

    /// Containers of the pod template as typed models
    pub fn containers(&self) -> Result<Vec<Container>> {
        let containers = self
            .pod_spec_list("containers")
            .ok_or_else(|| CoreError::NoContainers {
                workload: self.name().to_string(),
            })?;

        containers
            .iter()
            .map(|container| {
                Container::deserialize(container).map_err(|e| {
                    CoreError::Typed(TypedObjectError::Malformed {
                        api_version: "v1".to_string(),
                        kind: "Container".to_string(),
                        message: e.to_string(),
                    })
                })
            })
            .collect()
    }

    /// Pod template annotations; non-string values are rendered as JSON
    pub fn pod_annotations(&self) -> BTreeMap<String, String> {
        self.pod_template()
            .and_then(|template| template.nested_object("metadata.annotations"))
            .map(|annotations| {
                annotations
                    .iter()
                    .map(|(key, value)| {
                        let value = match value {
                            JsonValue::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (key.clone(), value)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Raw volume definitions of the pod template
    pub fn volumes(&self) -> &'a [JsonValue] {
        self.pod_spec_list("volumes").map(Vec::as_slice).unwrap_or_default()
    }

    /// Names listed under `imagePullSecrets`
    pub fn image_pull_secrets(&self) -> Vec<&'a str> {
        object_entries(self.pod_spec_list("imagePullSecrets"))
            .filter_map(|secret| secret.nested_str("name"))
            .collect()
    }

    /// ConfigMaps and Secrets consumed through env, envFrom, imagePullSecrets and volumes
    ///
    /// Missing or malformed lists contribute nothing.
    pub fn referenced_resources(&self) -> ReferencedResources {
        let mut refs = ReferencedResources::default();

        for container in object_entries(self.pod_spec_list("containers")) {
            for env in object_entries(container.nested_array("env")) {
                if let Some(name) = env.nested_str("valueFrom.configMapKeyRef.name") {
                    refs.config_maps.insert(name.to_string());
                }
                if let Some(name) = env.nested_str("valueFrom.secretKeyRef.name") {
                    refs.secrets.insert(name.to_string());
                }
            }

            for env_from in object_entries(container.nested_array("envFrom")) {
                if let Some(name) = env_from.nested_str("configMapRef.name") {
                    refs.config_maps.insert(name.to_string());
                }
                if let Some(name) = env_from.nested_str("secretRef.name") {
                    refs.secrets.insert(name.to_string());
                }
            }
        }

        for name in self.image_pull_secrets() {
            refs.secrets.insert(name.to_string());
        }

        for volume in self.volumes().iter().filter_map(JsonValue::as_object) {
            if let Some(name) = volume.nested_str("configMap.name") {
                refs.config_maps.insert(name.to_string());
            }
            if let Some(name) = volume.nested_str("secret.secretName") {
                refs.secrets.insert(name.to_string());
            }
        }

        refs
    }

    /// Pod template annotation keys that look like checksum annotations
    pub fn checksum_annotation_keys(&self) -> BTreeSet<String> {
        self.pod_template()
            .and_then(|template| template.nested_object("metadata.annotations"))
            .map(|annotations| {
                annotations
                    .keys()
                    .filter(|key| key.to_lowercase().contains(CHECKSUM_MARKER))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every mismatch between referenced resources and checksum annotations
    pub fn checksum_findings(&self) -> Vec<ChecksumFinding> {
        let refs = self.referenced_resources();
        let keys = self.checksum_annotation_keys();
        let workload = self.name();
        let covered = |name: &str| keys.iter().any(|key| key.contains(name));

        let missing_config_maps = refs
            .config_maps
            .iter()
            .filter(|name| !covered(name.as_str()))
            .map(|name| ChecksumFinding::MissingConfigMap {
                workload: workload.to_string(),
                config_map: name.clone(),
            });

        let missing_secrets = refs
            .secrets
            .iter()
            .filter(|name| !covered(name.as_str()))
            .map(|name| ChecksumFinding::MissingSecret {
                workload: workload.to_string(),
                secret: name.clone(),
            });

        let unnecessary = keys
            .iter()
            .filter(|key| !refs.all_names().any(|name| key.contains(name.as_str())))
            .map(|key| ChecksumFinding::UnnecessaryAnnotation {
                workload: workload.to_string(),
                annotation: key.clone(),
            });

        missing_config_maps
            .chain(missing_secrets)
            .chain(unnecessary)
            .collect()
    }

    /// Check that the pod template carries exactly the checksum annotations its
    /// consumed ConfigMaps and Secrets call for
    ///
    /// The checksum values themselves are not checked.
    pub fn verify_checksum_annotations(&self) -> ChecksumVerification {
        let findings = self.checksum_findings();
        if !findings.is_empty() {
            tracing::debug!(
                "{} {} has {} checksum annotation finding(s)",
                self.kind,
                self.name(),
                findings.len()
            );
        }
        ChecksumVerification::from_findings(findings)
    }
}

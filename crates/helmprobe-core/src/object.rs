//! Rendered Kubernetes objects with a typed and an untyped view
//!
//! Every document produced by `helm template` is kept twice:
//! - `typed`: a `k8s-openapi` model when `(apiVersion, kind)` is modelled here,
//!   otherwise the reason it could not be typed
//! - `tree`: the raw parse of the same document, used for equality and for
//!   fields or kinds the typed layer does not cover

use k8s_openapi::Resource;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, PersistentVolumeClaim, Pod, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::error::{CoreError, Result};
use crate::tree::NestedValue;

/// Why a rendered document has no typed representation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypedObjectError {
    #[error("No typed model for apiVersion '{api_version}' kind '{kind}'")]
    Unrecognized { api_version: String, kind: String },

    #[error("Rendered {kind} ({api_version}) does not match its typed model: {message}")]
    Malformed {
        api_version: String,
        kind: String,
        message: String,
    },

    #[error("Expected a {expected} but the rendered object is a {actual}")]
    KindMismatch { expected: String, actual: String },
}

/// A `k8s-openapi` model that can be extracted from a [`KnownObject`]
pub trait TypedResource: Resource + Sized {
    fn from_known(object: &KnownObject) -> Option<&Self>;
}

macro_rules! known_objects {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        /// Strongly-typed form of a rendered document
        #[derive(Debug, Clone)]
        pub enum KnownObject {
            $($variant(Box<$ty>),)+
        }

        impl KnownObject {
            fn from_tree(
                api_version: &str,
                kind: &str,
                tree: &JsonValue,
            ) -> std::result::Result<Self, TypedObjectError> {
                $(
                    if api_version == <$ty as Resource>::API_VERSION
                        && kind == <$ty as Resource>::KIND
                    {
                        return <$ty>::deserialize(tree)
                            .map(|object| KnownObject::$variant(Box::new(object)))
                            .map_err(|e| TypedObjectError::Malformed {
                                api_version: api_version.to_string(),
                                kind: kind.to_string(),
                                message: e.to_string(),
                            });
                    }
                )+

                Err(TypedObjectError::Unrecognized {
                    api_version: api_version.to_string(),
                    kind: kind.to_string(),
                })
            }

            pub fn api_version(&self) -> &'static str {
                match self {
                    $(KnownObject::$variant(_) => <$ty as Resource>::API_VERSION,)+
                }
            }

            pub fn kind(&self) -> &'static str {
                match self {
                    $(KnownObject::$variant(_) => <$ty as Resource>::KIND,)+
                }
            }

            pub fn metadata(&self) -> &ObjectMeta {
                match self {
                    $(KnownObject::$variant(object) => &object.metadata,)+
                }
            }
        }

        $(
            impl TypedResource for $ty {
                fn from_known(object: &KnownObject) -> Option<&Self> {
                    match object {
                        KnownObject::$variant(inner) => Some(inner.as_ref()),
                        _ => None,
                    }
                }
            }
        )+
    };
}

known_objects! {
    Deployment => Deployment,
    StatefulSet => StatefulSet,
    ReplicaSet => ReplicaSet,
    DaemonSet => DaemonSet,
    Job => Job,
    CronJob => CronJob,
    Pod => Pod,
    Service => Service,
    ServiceAccount => ServiceAccount,
    ConfigMap => ConfigMap,
    Secret => Secret,
    PersistentVolumeClaim => PersistentVolumeClaim,
    Ingress => Ingress,
    NetworkPolicy => NetworkPolicy,
    PodDisruptionBudget => PodDisruptionBudget,
    HorizontalPodAutoscaler => HorizontalPodAutoscaler,
    Role => Role,
    RoleBinding => RoleBinding,
    ClusterRole => ClusterRole,
    ClusterRoleBinding => ClusterRoleBinding,
}

/// One rendered Kubernetes document
///
/// Equality is structural over the raw tree only, so fields the typed layer
/// drops or normalizes never affect comparisons.
#[derive(Debug, Clone)]
pub struct RenderedObject {
    api_version: String,
    kind: String,
    name: Option<String>,
    typed: std::result::Result<KnownObject, TypedObjectError>,
    tree: JsonValue,
}

impl RenderedObject {
    /// Build both representations from an already-parsed tree
    pub fn from_tree(tree: JsonValue) -> Self {
        let api_version = tree.nested_str("apiVersion").unwrap_or_default().to_string();
        let kind = tree.nested_str("kind").unwrap_or_default().to_string();
        let name = tree.nested_str("metadata.name").map(str::to_string);
        let typed = KnownObject::from_tree(&api_version, &kind, &tree);

        if let Err(e) = &typed {
            tracing::debug!("{}/{} kept untyped: {}", kind, name.as_deref().unwrap_or(""), e);
        }

        Self {
            api_version,
            kind,
            name,
            typed,
            tree,
        }
    }

    /// Parse a single YAML document
    pub fn from_yaml(document: &str) -> Result<Self> {
        let tree: JsonValue = serde_yaml::from_str(document)?;
        Ok(Self::from_tree(tree))
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// `metadata.name`, absent for documents that only set `generateName`
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn typed(&self) -> std::result::Result<&KnownObject, &TypedObjectError> {
        self.typed.as_ref()
    }

    pub fn tree(&self) -> &JsonValue {
        &self.tree
    }

    /// Whether this object has exactly the given apiVersion, kind and name
    pub fn is(&self, api_version: &str, kind: &str, name: &str) -> bool {
        self.api_version == api_version && self.kind == kind && self.name() == Some(name)
    }

    /// Borrow the typed model as `K`
    pub fn as_resource<K: TypedResource>(&self) -> Result<&K> {
        let known = self.typed.as_ref().map_err(|e| CoreError::Typed(e.clone()))?;
        K::from_known(known).ok_or_else(|| {
            CoreError::Typed(TypedObjectError::KindMismatch {
                expected: K::KIND.to_string(),
                actual: known.kind().to_string(),
            })
        })
    }
}

impl PartialEq for RenderedObject {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

impl Eq for RenderedObject {}

impl NestedValue for RenderedObject {
    fn nested(&self, path: &str) -> Option<&JsonValue> {
        self.tree.nested(path)
    }
}

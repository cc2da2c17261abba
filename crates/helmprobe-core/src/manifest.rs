//! Queryable collection of rendered manifests
//!
//! `helm template` writes a `---` separator before every document, including
//! the first one. [`Manifests::parse`] splits on those separators, drops the
//! segment before the first one, and keeps every remaining document in order.

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::object::{RenderedObject, TypedResource};
use crate::workload::{ChecksumVerification, Workload, WorkloadKind};

/// Rendered manifests in the order the templating tool produced them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifests {
    objects: Vec<RenderedObject>,
}

impl Manifests {
    pub fn new(objects: Vec<RenderedObject>) -> Self {
        Self { objects }
    }

    /// Parse multi-document YAML output
    ///
    /// A document that cannot be typed is kept with its typed view set to the
    /// error; only a document that is not valid YAML fails the whole parse.
    pub fn parse(yaml: &str) -> Result<Self> {
        let mut objects = Vec::new();

        for (index, document) in split_documents(yaml).into_iter().enumerate().skip(1) {
            if is_blank_document(document) {
                continue;
            }

            let tree: JsonValue =
                serde_yaml::from_str(document).map_err(|e| CoreError::ManifestParse {
                    index,
                    message: e.to_string(),
                })?;
            if tree.is_null() {
                continue;
            }

            objects.push(RenderedObject::from_tree(tree));
        }

        tracing::debug!("parsed {} rendered objects", objects.len());
        Ok(Self { objects })
    }

    /// Parse a file containing multi-document YAML output
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn objects(&self) -> &[RenderedObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenderedObject> {
        self.objects.iter()
    }

    /// All objects matching `predicate`
    pub fn find_all<F>(&self, predicate: F) -> Vec<&RenderedObject>
    where
        F: Fn(&RenderedObject) -> bool,
    {
        self.objects.iter().filter(|object| predicate(object)).collect()
    }

    /// The single object matching `predicate`, if any
    ///
    /// Fails with [`CoreError::AmbiguousMatch`] when more than one object matches.
    pub fn find_one<F>(&self, predicate: F) -> Result<Option<&RenderedObject>>
    where
        F: Fn(&RenderedObject) -> bool,
    {
        let mut matches = self.find_all(predicate);
        if matches.len() > 1 {
            return Err(CoreError::AmbiguousMatch {
                count: matches.len(),
            });
        }
        Ok(matches.pop())
    }

    /// The single object matching `predicate`
    ///
    /// Fails with [`CoreError::NotFound`] when nothing matches.
    pub fn get_one<F>(&self, predicate: F) -> Result<&RenderedObject>
    where
        F: Fn(&RenderedObject) -> bool,
    {
        self.find_one(predicate)?.ok_or_else(|| CoreError::NotFound {
            description: "the provided predicate".to_string(),
        })
    }

    /// The single object with this apiVersion, kind and name
    pub fn get(&self, api_version: &str, kind: &str, name: &str) -> Result<&RenderedObject> {
        self.get_one(|object| object.is(api_version, kind, name))
            .map_err(|e| match e {
                CoreError::NotFound { .. } => CoreError::NotFound {
                    description: format!("{} {} '{}'", api_version, kind, name),
                },
                other => other,
            })
    }

    /// The single object of type `K` with this name, as its typed model
    pub fn get_resource<K: TypedResource>(&self, name: &str) -> Result<&K> {
        self.get(K::API_VERSION, K::KIND, name)?.as_resource()
    }

    // Typed shortcuts for the kinds charts most commonly render

    pub fn deployment(&self, name: &str) -> Result<&Deployment> {
        self.get_resource(name)
    }

    pub fn stateful_set(&self, name: &str) -> Result<&StatefulSet> {
        self.get_resource(name)
    }

    pub fn job(&self, name: &str) -> Result<&Job> {
        self.get_resource(name)
    }

    pub fn ingress(&self, name: &str) -> Result<&Ingress> {
        self.get_resource(name)
    }

    pub fn service(&self, name: &str) -> Result<&Service> {
        self.get_resource(name)
    }

    pub fn service_account(&self, name: &str) -> Result<&ServiceAccount> {
        self.get_resource(name)
    }

    pub fn config_map(&self, name: &str) -> Result<&ConfigMap> {
        self.get_resource(name)
    }

    pub fn secret(&self, name: &str) -> Result<&Secret> {
        self.get_resource(name)
    }

    pub fn persistent_volume_claim(&self, name: &str) -> Result<&PersistentVolumeClaim> {
        self.get_resource(name)
    }

    /// Value stored under `key` in ConfigMap `name`
    pub fn config_map_value(&self, name: &str, key: &str) -> Result<&str> {
        self.config_map(name)?
            .data
            .as_ref()
            .and_then(|data| data.get(key))
            .map(String::as_str)
            .ok_or_else(|| missing_data("ConfigMap", name, key))
    }

    /// Value stored under `key` in Secret `name`, decoded as UTF-8
    ///
    /// `data` is consulted first, then `stringData`.
    pub fn secret_value(&self, name: &str, key: &str) -> Result<String> {
        let secret = self.secret(name)?;

        if let Some(bytes) = secret.data.as_ref().and_then(|data| data.get(key)) {
            return String::from_utf8(bytes.0.clone()).map_err(|e| {
                CoreError::invalid_argument(format!(
                    "Secret '{}' key '{}' is not valid UTF-8: {}",
                    name, key, e
                ))
            });
        }

        secret
            .string_data
            .as_ref()
            .and_then(|data| data.get(key))
            .cloned()
            .ok_or_else(|| missing_data("Secret", name, key))
    }

    /// Every object whose kind is a workload kind
    pub fn find_all_workloads(&self) -> Vec<Workload<'_>> {
        self.objects
            .iter()
            .filter_map(|object| Workload::new(object).ok())
            .collect()
    }

    /// The workload of `kind` named `name`, if present
    ///
    /// `kind` is checked before searching, so a non-workload kind fails with
    /// [`CoreError::UnrecognizedKind`] even when nothing would match.
    pub fn find_workload(&self, kind: &str, name: &str) -> Result<Option<Workload<'_>>> {
        let kind = WorkloadKind::check(kind, name)?;
        self.find_one(|object| object.kind() == kind.as_str() && object.name() == Some(name))?
            .map(Workload::new)
            .transpose()
    }

    /// The workload of `kind` named `name`
    pub fn get_workload(&self, kind: &str, name: &str) -> Result<Workload<'_>> {
        self.find_workload(kind, name)?.ok_or_else(|| CoreError::NotFound {
            description: format!(
                "workload {} '{}' (workloads are defined here: https://kubernetes.io/docs/concepts/workloads)",
                kind, name
            ),
        })
    }

    /// Check the checksum annotations of every workload
    ///
    /// Findings of individual workloads are concatenated in document order.
    pub fn verify_all_checksum_annotations(&self) -> ChecksumVerification {
        let findings = self
            .find_all_workloads()
            .iter()
            .flat_map(Workload::checksum_findings)
            .collect();
        ChecksumVerification::from_findings(findings)
    }

    /// Unified diff of the two sets' canonical YAML, or `None` when they are equal
    pub fn diff(&self, other: &Manifests) -> Option<String> {
        if self == other {
            return None;
        }

        let left = self.canonical_yaml();
        let right = other.canonical_yaml();
        let diff = similar::TextDiff::from_lines(&left, &right);
        Some(
            diff.unified_diff()
                .context_radius(3)
                .header("left", "right")
                .to_string(),
        )
    }

    fn canonical_yaml(&self) -> String {
        self.objects
            .iter()
            .map(|object| {
                let body = serde_yaml::to_string(object.tree()).unwrap_or_default();
                format!("---\n{}", body)
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a Manifests {
    type Item = &'a RenderedObject;
    type IntoIter = std::slice::Iter<'a, RenderedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

fn missing_data(kind: &str, name: &str, key: &str) -> CoreError {
    CoreError::MissingData {
        kind: kind.to_string(),
        name: name.to_string(),
        key: key.to_string(),
    }
}

/// Split on separator lines; the first element is whatever precedes the first separator
fn split_documents(yaml: &str) -> Vec<&str> {
    let mut documents = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in yaml.split_inclusive('\n') {
        if is_separator(line) {
            documents.push(&yaml[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    documents.push(&yaml[start..]);

    documents
}

fn is_separator(line: &str) -> bool {
    match line.trim_end().strip_prefix("---") {
        Some(rest) => {
            rest.is_empty() || (rest.starts_with(' ') && rest.trim_start().starts_with('#'))
        }
        None => false,
    }
}

fn is_blank_document(document: &str) -> bool {
    document
        .lines()
        .all(|line| line.trim().is_empty() || line.trim_start().starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDERED: &str = r#"---
# Source: my-app/templates/serviceaccount.yaml
apiVersion: v1
kind: ServiceAccount
metadata:
  name: my-app
automountServiceAccountToken: true
---
# Source: my-app/templates/configmap.yaml
apiVersion: v1
kind: ConfigMap
metadata:
  name: my-app-config
data:
  bucketName: app-data
  banner: |
    ---
    not a separator
---
# Source: my-app/templates/secret.yaml
apiVersion: v1
kind: Secret
metadata:
  name: app-password
data:
  password: cGFzc3dvcmQxMjM=
stringData:
  username: admin
---
# Source: my-app/templates/deployment.yaml
apiVersion: apps/v1
kind: Deployment
metadata:
  name: my-app
spec:
  selector:
    matchLabels:
      app: my-app
  template:
    metadata:
      labels:
        app: my-app
    spec:
      containers:
        - name: main
          image: nginx:1.16.0
          imagePullPolicy: IfNotPresent
---
# Source: my-app/templates/servicemonitor.yaml
apiVersion: monitoring.coreos.com/v1
kind: ServiceMonitor
metadata:
  name: my-app
"#;

    fn manifests() -> Manifests {
        Manifests::parse(RENDERED).unwrap()
    }

    #[test]
    fn test_parse_preserves_order() {
        let manifests = manifests();
        let kinds: Vec<&str> = manifests.iter().map(RenderedObject::kind).collect();
        assert_eq!(
            kinds,
            vec!["ServiceAccount", "ConfigMap", "Secret", "Deployment", "ServiceMonitor"]
        );
    }

    #[test]
    fn test_parse_discards_leading_segment() {
        let yaml = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: ignored\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: kept\n";
        let manifests = Manifests::parse(yaml).unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests.objects()[0].name(), Some("kept"));
    }

    #[test]
    fn test_parse_skips_comment_only_documents() {
        let yaml = "---\n# Source: my-app/templates/empty.yaml\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: kept\n";
        let manifests = Manifests::parse(yaml).unwrap();
        assert_eq!(manifests.len(), 1);
    }

    #[test]
    fn test_parse_keeps_duplicates() {
        let doc = "---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: same\n";
        let manifests = Manifests::parse(&doc.repeat(2)).unwrap();
        assert_eq!(manifests.len(), 2);
    }

    #[test]
    fn test_parse_invalid_yaml_fails() {
        let err = Manifests::parse("---\nkind: [unclosed\n").unwrap_err();
        assert!(matches!(err, CoreError::ManifestParse { index: 1, .. }));
    }

    #[test]
    fn test_separator_inside_block_scalar_is_kept() {
        let banner = manifests().config_map_value("my-app-config", "banner").unwrap().to_string();
        assert_eq!(banner, "---\nnot a separator\n");
    }

    #[test]
    fn test_get_typed_objects() {
        let manifests = manifests();
        let deployment = manifests.deployment("my-app").unwrap();
        let spec = deployment.spec.as_ref().unwrap();
        let pod_spec = spec.template.spec.as_ref().unwrap();
        assert_eq!(pod_spec.containers[0].image.as_deref(), Some("nginx:1.16.0"));

        let account = manifests.service_account("my-app").unwrap();
        assert_eq!(account.automount_service_account_token, Some(true));
    }

    #[test]
    fn test_config_map_and_secret_values() {
        let manifests = manifests();
        assert_eq!(manifests.config_map_value("my-app-config", "bucketName").unwrap(), "app-data");
        assert_eq!(manifests.secret_value("app-password", "password").unwrap(), "password123");
        assert_eq!(manifests.secret_value("app-password", "username").unwrap(), "admin");

        let err = manifests.config_map_value("my-app-config", "missing").unwrap_err();
        assert_eq!(err.to_string(), "ConfigMap 'my-app-config' has no data under key 'missing'");
    }

    #[test]
    fn test_find_one_and_get_one_cardinality() {
        let doc = "---\napiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: twin\n";
        let twins = Manifests::parse(&doc.repeat(2)).unwrap();

        let err = twins.find_one(|o| o.kind() == "Deployment").unwrap_err();
        assert!(matches!(err, CoreError::AmbiguousMatch { count: 2 }));

        let none = twins.find_one(|o| o.kind() == "StatefulSet").unwrap();
        assert!(none.is_none());

        let err = twins.get_one(|o| o.kind() == "StatefulSet").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_get_reports_identity_when_missing() {
        let err = manifests().get("apps/v1", "Deployment", "other").unwrap_err();
        assert_eq!(
            err.to_string(),
            "No rendered Kubernetes object matches apps/v1 Deployment 'other'"
        );
    }

    #[test]
    fn test_untyped_objects_remain_queryable() {
        let manifests = manifests();
        let monitor = manifests.get("monitoring.coreos.com/v1", "ServiceMonitor", "my-app").unwrap();
        assert!(monitor.typed().is_err());
    }

    #[test]
    fn test_workload_lookup_validates_kind_first() {
        let manifests = manifests();
        let err = manifests.find_workload("Service", "nothing-here").unwrap_err();
        assert!(matches!(err, CoreError::UnrecognizedKind { .. }));

        assert!(manifests.find_workload("StatefulSet", "my-app").unwrap().is_none());
        assert!(matches!(
            manifests.get_workload("StatefulSet", "my-app"),
            Err(CoreError::NotFound { .. })
        ));
        assert_eq!(manifests.get_workload("Deployment", "my-app").unwrap().name(), "my-app");
    }

    #[test]
    fn test_find_all_workloads() {
        let workloads = manifests().find_all_workloads().len();
        assert_eq!(workloads, 1);
    }

    #[test]
    fn test_equal_renders_compare_equal() {
        assert_eq!(manifests(), manifests());
        assert!(manifests().diff(&manifests()).is_none());
    }

    #[test]
    fn test_differing_renders_produce_diff() {
        let changed = Manifests::parse(&RENDERED.replace("cGFzc3dvcmQxMjM=", "eA==")).unwrap();
        assert_ne!(manifests(), changed);

        let diff = manifests().diff(&changed).unwrap();
        assert!(diff.contains("-  password: cGFzc3dvcmQxMjM="));
        assert!(diff.contains("+  password: eA=="));
    }

    const UNTYPED_WORKLOADS: &str = r#"---
apiVersion: apps/v1beta2
kind: Deployment
metadata:
  name: legacy
spec:
  template:
    metadata:
      annotations:
        checksum/legacy-config: abc
    spec:
      containers:
        - name: main
          image: nginx
          envFrom:
            - configMapRef:
                name: legacy-config
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: sloppy
spec:
  replicas: "two"
  template:
    spec:
      containers:
        - name: main
          image: nginx
          envFrom:
            - secretRef:
                name: sloppy-secret
"#;

    #[test]
    fn test_workloads_without_typed_view_are_verified() {
        let manifests = Manifests::parse(UNTYPED_WORKLOADS).unwrap();
        assert!(matches!(
            manifests.objects()[0].typed(),
            Err(crate::object::TypedObjectError::Unrecognized { .. })
        ));
        assert!(matches!(
            manifests.objects()[1].typed(),
            Err(crate::object::TypedObjectError::Malformed { .. })
        ));

        let names: Vec<&str> = manifests
            .find_all_workloads()
            .iter()
            .map(|workload| workload.name())
            .collect();
        assert_eq!(names, vec!["legacy", "sloppy"]);

        let legacy = manifests.get_workload("Deployment", "legacy").unwrap();
        assert!(legacy.verify_checksum_annotations().success);
        assert_eq!(legacy.containers().unwrap()[0].name, "main");

        let sloppy = manifests.get_workload("Deployment", "sloppy").unwrap();
        let result = sloppy.verify_checksum_annotations();
        assert!(!result.success);
        assert_eq!(
            result.message,
            "Workload 'sloppy' is missing checksum annotation for referenced Secret 'sloppy-secret'."
        );
    }
}

//! Chart layout and template/schema value parity

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::{schema, scraper};

/// Name of the templates directory inside a chart
pub const TEMPLATES_DIR: &str = "templates";

/// Name of the values schema file inside a chart
pub const SCHEMA_FILE: &str = "values.schema.json";

/// A chart directory or packaged chart archive on disk
///
/// Only directories have readable templates and schema; an archive is passed
/// to the templating tool as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chart {
    path: PathBuf,
}

impl Chart {
    /// Fails with [`CoreError::InvalidArgument`] if `path` does not exist
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            let shown = std::path::absolute(&path).unwrap_or_else(|_| path.clone());
            return Err(CoreError::invalid_argument(format!(
                "Helm chart '{}' does not exist.",
                shown.display()
            )));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.path.join(TEMPLATES_DIR)
    }

    pub fn schema_file(&self) -> PathBuf {
        self.path.join(SCHEMA_FILE)
    }

    /// Value paths referenced by the chart's templates
    pub fn values_from_templates(&self) -> Result<BTreeSet<String>> {
        scraper::scan(self.templates_dir())
    }

    /// Leaf value paths declared by the chart's values schema
    pub fn values_from_schema(&self) -> Result<BTreeSet<String>> {
        schema::read_leaf_paths(self.schema_file())
    }

    /// Compare the values the templates use with the values the schema declares
    pub fn value_parity(&self) -> Result<ValueParity> {
        let templates = self.values_from_templates()?;
        let schema = self.values_from_schema()?;
        Ok(ValueParity::between(&templates, &schema))
    }
}

/// Differences between template-referenced and schema-declared value paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueParity {
    /// Referenced by templates but not declared in the schema
    pub only_in_templates: BTreeSet<String>,
    /// Declared in the schema but never referenced by templates
    pub only_in_schema: BTreeSet<String>,
}

impl ValueParity {
    pub fn between(templates: &BTreeSet<String>, schema: &BTreeSet<String>) -> Self {
        Self {
            only_in_templates: templates.difference(schema).cloned().collect(),
            only_in_schema: schema.difference(templates).cloned().collect(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.only_in_templates.is_empty() && self.only_in_schema.is_empty()
    }
}

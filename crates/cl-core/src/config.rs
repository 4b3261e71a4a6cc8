//! Export configuration files
//!
//! An export configuration is a JSON document naming the catalog to read, the
//! filters to apply and where to write the course loader file. Command-line
//! options are layered on top with [`ExportConfig::merge`].

use crate::error::{Error, Result};
use crate::row::Operation;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for one export run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Catalog file to read
    pub catalog: Option<PathBuf>,
    /// Course loader file to write
    pub output: Option<PathBuf>,
    /// Log file; logs go to stderr when unset
    pub log_file: Option<PathBuf>,
    /// Filter expressions, all of which must pass
    pub filters: Vec<String>,
    /// Operation written to every row; update when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
}

impl ExportConfig {
    /// Load a configuration file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the configuration file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content).map_err(|e| Error::FileWrite {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Layer command-line settings over this configuration
    ///
    /// Paths given in `overrides` replace configured ones, filters are
    /// appended, and an operation given in `overrides` replaces the
    /// configured one.
    pub fn merge(mut self, overrides: ExportConfig) -> Self {
        if overrides.catalog.is_some() {
            self.catalog = overrides.catalog;
        }
        if overrides.output.is_some() {
            self.output = overrides.output;
        }
        if overrides.log_file.is_some() {
            self.log_file = overrides.log_file;
        }
        self.filters.extend(overrides.filters);
        if overrides.operation.is_some() {
            self.operation = overrides.operation;
        }
        self
    }

    /// The operation to tag rows with
    pub fn operation(&self) -> Operation {
        self.operation.unwrap_or_default()
    }

    /// The catalog path, required for an export
    pub fn catalog_path(&self) -> Result<&Path> {
        self.catalog
            .as_deref()
            .ok_or_else(|| Error::Config("no catalog file given".to_string()))
    }

    /// The output path, required for an export
    pub fn output_path(&self) -> Result<&Path> {
        self.output
            .as_deref()
            .ok_or_else(|| Error::Config("no output file given".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = ExportConfig {
            catalog: Some(PathBuf::from("catalog.json")),
            output: Some(PathBuf::from("courses.txt")),
            log_file: None,
            filters: vec!["year == 2017".to_string()],
            operation: Some(Operation::Rollover),
        };

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"rollover\""));
        let loaded: ExportConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_defaults() {
        let config: ExportConfig = serde_json::from_str("{\"filters\": [\"/^CS/\"]}").unwrap();
        assert_eq!(config.operation, None);
        assert_eq!(config.operation(), Operation::Update);
        assert!(config.catalog_path().is_err());
        assert_eq!(config.filters.len(), 1);
    }

    #[test]
    fn test_merge_overrides() {
        let base = ExportConfig {
            catalog: Some(PathBuf::from("catalog.json")),
            output: Some(PathBuf::from("old.txt")),
            filters: vec!["year == 2017".to_string()],
            operation: Some(Operation::Delete),
            ..ExportConfig::default()
        };
        let cli = ExportConfig {
            output: Some(PathBuf::from("new.txt")),
            filters: vec!["code ~ /^CS/".to_string()],
            ..ExportConfig::default()
        };

        let merged = base.merge(cli);
        assert_eq!(merged.catalog_path().unwrap(), Path::new("catalog.json"));
        assert_eq!(merged.output_path().unwrap(), Path::new("new.txt"));
        assert_eq!(merged.filters, vec!["year == 2017", "code ~ /^CS/"]);
        assert_eq!(merged.operation(), Operation::Delete);
    }

    #[test]
    fn test_merge_explicit_update_overrides_configured_operation() {
        let base = ExportConfig {
            operation: Some(Operation::Rollover),
            ..ExportConfig::default()
        };
        let cli = ExportConfig {
            operation: Some(Operation::Update),
            ..ExportConfig::default()
        };
        assert_eq!(base.merge(cli).operation(), Operation::Update);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        let config = ExportConfig {
            filters: vec!["! year in [2015,2016]".to_string()],
            ..ExportConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ExportConfig::load(&path).unwrap(), config);
    }
}

//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use crate::output::RdfSyntax;
use lido2rdf_domain::NamespaceTable;
use lido2rdf_harvest::HarvestConfig;
use lido2rdf_mapping::RecordSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "lido2rdf.toml";

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Harvest settings
    pub harvest: HarvestConfig,

    /// Output settings
    pub output: OutputSettings,

    /// Extra target namespace bindings
    pub namespaces: BTreeMap<String, String>,

    /// Record schema overrides
    pub schema: SchemaSettings,
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Syntax used when none is given or derivable
    pub format: String,

    /// Enable colored rule listings
    pub color: bool,
}

/// Record schema overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Record element, e.g. `lido:lido`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_element: Option<String>,

    /// Selector for the record identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,

    /// Extra identity table entries: tag → identifier children
    pub identifiers: BTreeMap<String, Vec<String>>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: "turtle".to_string(),
            color: true,
        }
    }
}

impl Config {
    /// Get the per-user configuration file path.
    pub fn user_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".lido2rdf").join("config.toml"))
    }

    /// Find the configuration file to use.
    ///
    /// An explicit path wins, then `./lido2rdf.toml`, then the per-user file.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        Self::user_path().filter(|path| path.is_file())
    }

    /// Load configuration, falling back to defaults when no file exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::locate(explicit) {
            Some(path) => {
                if !path.is_file() {
                    return Err(CliError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a configuration document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.harvest.validate().map_err(CliError::Config)?;
        self.default_syntax()?;
        Ok(())
    }

    /// Configured default output syntax.
    pub fn default_syntax(&self) -> Result<RdfSyntax> {
        RdfSyntax::parse(&self.output.format)
    }

    /// Target namespace table with the configured extra bindings.
    pub fn namespace_table(&self) -> NamespaceTable {
        let mut table = NamespaceTable::default();
        for (prefix, uri) in &self.namespaces {
            table.bind(prefix.as_str(), uri.as_str());
        }
        table
    }

    /// LIDO record schema with the configured overrides applied.
    pub fn record_schema(&self) -> Result<RecordSchema> {
        let mut schema = RecordSchema::lido();
        if self.schema.record_element.is_some() || self.schema.record_id.is_some() {
            let element = self.schema.record_element.as_deref().unwrap_or("lido:lido");
            let record_id = self
                .schema
                .record_id
                .as_deref()
                .unwrap_or("./lido:lidoRecID/text()");
            schema = schema.with_record(element, Some(record_id))?;
        }
        for (tag, locations) in &self.schema.identifiers {
            let locations: Vec<&str> = locations.iter().map(String::as_str).collect();
            schema.add_identifier(tag, &locations)?;
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lido2rdf_mapping::xml::XmlName;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_syntax().unwrap(), RdfSyntax::Turtle);
        assert!(config.output.color);
        assert_eq!(config.harvest.metadata_prefix, "lido");
    }

    #[test]
    fn test_partial_file() {
        let config = Config::from_toml(
            r#"
            [harvest]
            max_retries = 2

            [namespaces]
            ex = "http://example.org/"
            "#,
        )
        .unwrap();
        assert_eq!(config.harvest.max_retries, 2);
        assert_eq!(config.harvest.timeout_secs, 60);
        assert_eq!(config.output.format, "turtle");
        assert_eq!(config.namespace_table().get("ex"), Some("http://example.org/"));
        assert_eq!(
            config.namespace_table().get("crm"),
            Some("http://www.cidoc-crm.org/cidoc-crm/")
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_toml("[output]\nformat = \"csv\"").is_err());
        assert!(Config::from_toml("[harvest]\ntimeout_secs = 0").is_err());
        assert!(matches!(
            Config::from_toml("[harvest\n"),
            Err(CliError::Toml(_))
        ));
    }

    #[test]
    fn test_schema_overrides() {
        let config = Config::from_toml(
            r#"
            [schema]
            record_element = "lido:lidoWrap"

            [schema.identifiers]
            "lido:displayState" = ["."]
            "#,
        )
        .unwrap();
        let schema = config.record_schema().unwrap();
        assert!(schema.is_record(&XmlName::qualified("http://www.lido-schema.org", "lidoWrap")));
        assert!(schema
            .identifier_locations(&XmlName::qualified("http://www.lido-schema.org", "displayState"))
            .is_some());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[output]\nformat = \"nt\"\ncolor = false").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.default_syntax().unwrap(), RdfSyntax::NTriples);
        assert!(!config.output.color);
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/nonexistent/lido2rdf.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}

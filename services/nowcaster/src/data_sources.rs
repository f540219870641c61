//! Observation data sources keyed by `DOMAIN`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use archive::DataSource;
use tracing::debug;

/// Table shipped with the binary.
const BUILTIN_DATA_SOURCES: &str = include_str!("../config/data_sources.yaml");

/// Parsed data-source table. Root paths are expanded on lookup so an unset
/// variable only matters for the domain that uses it.
#[derive(Debug, Clone)]
pub struct DataSources {
    sources: BTreeMap<String, DataSource>,
}

impl DataSources {
    /// Table embedded in the binary.
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_DATA_SOURCES).context("Failed to parse built-in data sources")
    }

    /// Load a data-source YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read data sources from {:?}", path.as_ref()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse data sources from {:?}", path.as_ref()))
    }

    fn parse(content: &str) -> Result<Self> {
        let sources: BTreeMap<String, DataSource> = serde_yaml::from_str(content)?;
        debug!(count = sources.len(), "Loaded data sources");
        Ok(Self { sources })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Source for `domain` with `~` and environment variables in its root
    /// path expanded.
    pub fn get(&self, domain: &str) -> Result<DataSource> {
        let mut source = self.sources.get(domain).cloned().with_context(|| {
            format!(
                "Unknown data source '{}', known: {}",
                domain,
                self.names().collect::<Vec<_>>().join(", ")
            )
        })?;
        let root = source.root_path.to_string_lossy().into_owned();
        let expanded = shellexpand::full(&root)
            .with_context(|| format!("Failed to expand root path of data source '{}'", domain))?;
        source.root_path = PathBuf::from(expanded.as_ref());
        Ok(source)
    }
}

//! Layered configuration resolution: defaults, then one named profile.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::error::{ConfigError, Result};
use crate::profiles;

/// Environment variable consulted when `OUTPUT_PATH` is null.
pub const OUTPUT_PATH_ENV: &str = "PPN_OUTPUT_PATH";

/// Output location used when neither the profile nor the environment sets one.
pub const FALLBACK_OUTPUT_PATH: &str = "~/ppn/output";

/// Resolves a profile name into a [`RunConfig`].
///
/// Profiles are looked up first as `<profile_dir>/<name>.yaml` (or `.yml`)
/// and then in the built-in table, so files can shadow built-ins.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    profile_dir: Option<PathBuf>,
    default_output_path: String,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Resolver using only built-in profiles. Reads `PPN_OUTPUT_PATH` once.
    pub fn new() -> Self {
        let default_output_path = std::env::var(OUTPUT_PATH_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| FALLBACK_OUTPUT_PATH.to_string());
        Self {
            profile_dir: None,
            default_output_path,
        }
    }

    /// Also look for `<name>.yaml` profiles in `dir`.
    pub fn with_profile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile_dir = Some(dir.into());
        self
    }

    /// Location substituted for a null `OUTPUT_PATH`.
    pub fn with_default_output_path(mut self, path: impl Into<String>) -> Self {
        self.default_output_path = path.into();
        self
    }

    /// Merge the named profile over the defaults.
    ///
    /// `None` and `"defaults"` yield the defaults table. Unknown profile
    /// names and unknown keys are errors. `NUM_TIMESTEPS` is derived from
    /// `MAX_LEADTIME / NOWCAST_TIMESTEP` when null and a null `OUTPUT_PATH`
    /// is replaced with the default output location.
    pub fn resolve(&self, profile: Option<&str>) -> Result<RunConfig> {
        let name = profile.unwrap_or(profiles::DEFAULTS);
        let overrides = self.lookup(name)?;

        let mut table = profiles::defaults();
        for (key, value) in overrides {
            if !table.contains_key(&key) {
                return Err(ConfigError::UnknownKey {
                    profile: name.to_string(),
                    key,
                });
            }
            debug!(profile = name, key = %key, value = %value, "Overriding default");
            table.insert(key, value);
        }

        let mut config: RunConfig = serde_json::from_value(Value::Object(table))
            .map_err(|e| ConfigError::invalid(name, e.to_string()))?;

        if config.nowcast_timestep == 0 {
            return Err(ConfigError::invalid(name, "NOWCAST_TIMESTEP must be positive"));
        }
        if config.num_timesteps.is_none() {
            config.num_timesteps = Some((config.max_leadtime / config.nowcast_timestep) as usize);
        }

        let output_path = config
            .output_path
            .take()
            .unwrap_or_else(|| self.default_output_path.clone());
        config.output_path = Some(shellexpand::tilde(&output_path).into_owned());

        info!(
            profile = name,
            domain = %config.domain,
            timesteps = config.timesteps(),
            ensemble_size = config.ensemble_size,
            "Resolved run configuration"
        );

        Ok(config)
    }

    /// Names of all profiles this resolver can see, sorted and deduplicated.
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = profiles::BUILTIN_PROFILES
            .iter()
            .map(|s| s.to_string())
            .collect();

        if let Some(dir) = &self.profile_dir {
            if let Ok(entries) = fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    let is_yaml = matches!(
                        path.extension().and_then(|e| e.to_str()),
                        Some("yaml") | Some("yml")
                    );
                    if let (true, Some(stem)) = (is_yaml, path.file_stem().and_then(|s| s.to_str())) {
                        names.push(stem.to_string());
                    }
                }
            }
        }

        names.sort();
        names.dedup();
        names
    }

    fn lookup(&self, name: &str) -> Result<Map<String, Value>> {
        if let Some(path) = self.profile_file(name) {
            debug!(profile = name, path = %path.display(), "Loading profile file");
            return load_profile_file(&path);
        }
        profiles::builtin(name).ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    fn profile_file(&self, name: &str) -> Option<PathBuf> {
        let dir = self.profile_dir.as_ref()?;
        ["yaml", "yml"]
            .iter()
            .map(|ext| dir.join(format!("{}.{}", name, ext)))
            .find(|p| p.is_file())
    }
}

/// Read a YAML mapping of overrides. An empty file means no overrides.
fn load_profile_file(path: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ProfileRead {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(Map::new());
    }

    let parsed: Option<Value> =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ProfileParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    match parsed {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(ConfigError::ProfileParse {
            path: path.to_path_buf(),
            message: "expected a mapping of parameter names to values".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ConfigResolver {
        ConfigResolver::new().with_default_output_path("/tmp/ppn-output")
    }

    #[test]
    fn test_derives_num_timesteps() {
        let config = resolver().resolve(Some("test")).unwrap();
        assert_eq!(config.num_timesteps, Some(6));
        assert_eq!(config.timesteps(), 6);
    }

    #[test]
    fn test_null_output_path_uses_default() {
        let config = resolver().resolve(None).unwrap();
        assert_eq!(config.output_path.as_deref(), Some("/tmp/ppn-output"));
    }

    #[test]
    fn test_explicit_output_path_kept() {
        let config = resolver().resolve(Some("esteri")).unwrap();
        assert_eq!(config.output_path.as_deref(), Some("/dev/shm/ppn"));
    }

    #[test]
    fn test_unknown_profile_is_error() {
        let err = resolver().resolve(Some("unknown-profile")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile(ref name) if name == "unknown-profile"));
        assert!(err.to_string().contains("unknown-profile"));
    }

    #[test]
    fn test_profile_names_include_builtins() {
        let names = resolver().profile_names();
        assert!(names.contains(&"defaults".to_string()));
        assert!(names.contains(&"docker_ravake".to_string()));
    }
}

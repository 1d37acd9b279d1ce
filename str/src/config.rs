use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default name of the project config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "str.yml";

/// Optional per-project settings. Command line flags take precedence.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Program used to execute the bundle.
    pub runtime: Option<String>,
    /// Package directory exported to the test process as `NODE_PATH`,
    /// relative to the project directory.
    pub node_modules: Option<PathBuf>,
    /// Run every test file in its own bundle and process.
    pub isolate: bool,
}

impl ProjectConfig {
    pub fn load(filename: impl AsRef<Path>) -> Result<Self> {
        let filename = filename.as_ref();
        let content = std::fs::read_to_string(filename)
            .with_context(|| format!("cannot read config file {}", filename.display()))?;
        let config: ProjectConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config file {}", filename.display()))?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise `str.yml` in `dir` when it exists.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        match path {
            Some(path) => Self::load(dir.join(path)),
            None => {
                let default = dir.join(CONFIG_FILE);
                match default.is_file() {
                    true => Self::load(default),
                    false => Ok(Self::default()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_load_should_work() -> Result<()> {
        let config: ProjectConfig = serde_yaml::from_str(include_str!("../fixtures/str.yml"))?;
        assert_eq!(
            config,
            ProjectConfig {
                runtime: Some("node".into()),
                node_modules: Some("vendor/node_modules".into()),
                isolate: true,
            }
        );
        Ok(())
    }

    #[test]
    fn config_discover_should_fall_back_to_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        assert_eq!(ProjectConfig::discover(None, dir.path())?, ProjectConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE), "isolate: true\n")?;
        assert!(ProjectConfig::discover(None, dir.path())?.isolate);

        assert!(ProjectConfig::discover(Some(Path::new("missing.yml")), dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn config_should_reject_unknown_keys() {
        let ret = serde_yaml::from_str::<ProjectConfig>("timeout: 3\n");
        assert!(ret.is_err());
    }
}

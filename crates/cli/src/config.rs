//! Agent configuration and host identity

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the agent configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mackerel-agent/mackerel-agent.conf";

/// The subset of the agent configuration the plugin needs
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// API key (can also be set via MACKEREL_APIKEY env var)
    #[serde(default)]
    pub apikey: String,

    /// API base URL
    #[serde(default = "default_apibase")]
    pub apibase: String,

    /// Agent state directory holding the host id file
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_apibase() -> String {
    "https://api.mackerelio.com".to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from("/var/lib/mackerel-agent")
}

impl AgentConfig {
    /// Load configuration from the TOML file at `path` and the environment
    pub fn load(path: &Path) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(config::Environment::with_prefix("MACKEREL"))
            .build()
            .context("failed to load the config file")?;

        let agent: AgentConfig = config
            .try_deserialize()
            .context("failed to load the config file")?;

        if agent.apikey.is_empty() {
            bail!("failed to load the config file: apikey is not set");
        }

        Ok(agent)
    }

    /// Read the id the agent registered this host with
    pub fn load_host_id(&self) -> Result<String> {
        let path = self.root.join("id");
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to load the host ID from {}", path.display()))?;

        let host_id = content.trim();
        if host_id.is_empty() {
            bail!("failed to load the host ID: {} is empty", path.display());
        }

        Ok(host_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("mackerel-agent.conf");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
apikey = "abcde"
root = "/opt/agent"
apibase = "https://mackerel.example.com"

[plugin.checks.meta]
command = ["check-meta", "-n", "app", "-k", "version", "-e", "1.0"]
"#,
        );

        let config = AgentConfig::load(&path).unwrap();
        assert_eq!(config.apikey, "abcde");
        assert_eq!(config.root, PathBuf::from("/opt/agent"));
        assert_eq!(config.apibase, "https://mackerel.example.com");
    }

    #[test]
    fn test_load_config_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "apikey = \"abcde\"\n");

        let config = AgentConfig::load(&path).unwrap();
        assert_eq!(config.apibase, default_apibase());
        assert_eq!(config.root, default_root());
    }

    #[test]
    fn test_missing_config_file() {
        let dir = TempDir::new().unwrap();
        let err = AgentConfig::load(&dir.path().join("missing.conf")).unwrap_err();
        assert!(format!("{:#}", err).starts_with("failed to load the config file"));
    }

    #[test]
    fn test_load_host_id() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("id"), "4Hx7a9bCd\n").unwrap();

        let config = AgentConfig {
            apikey: "abcde".to_string(),
            apibase: default_apibase(),
            root: dir.path().to_path_buf(),
        };
        assert_eq!(config.load_host_id().unwrap(), "4Hx7a9bCd");
    }

    #[test]
    fn test_missing_host_id() {
        let dir = TempDir::new().unwrap();
        let config = AgentConfig {
            apikey: "abcde".to_string(),
            apibase: default_apibase(),
            root: dir.path().to_path_buf(),
        };
        let err = config.load_host_id().unwrap_err();
        assert!(err.to_string().starts_with("failed to load the host ID"));

        std::fs::write(dir.path().join("id"), "  \n").unwrap();
        assert!(config.load_host_id().is_err());
    }
}

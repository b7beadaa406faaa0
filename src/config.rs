//! Repository bindings and server settings, loaded once at startup.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{DeployError, Result};

pub const DEFAULT_PORT: u16 = 5099;
pub const CONFIG_PATH_VAR: &str = "PUSH_DEPLOY_CONFIG";

const PORT_VAR: &str = "PORT";
const TIMEOUT_VAR: &str = "SCRIPT_TIMEOUT_SECS";
const REPO_FULL_NAME_VAR: &str = "REPO_FULL_NAME";
const SECRET_VAR: &str = "GITHUB_WEBHOOK_SECRET";
const SHELL_PATH_VAR: &str = "SHELL_PATH";
const BRANCH_NAME_VAR: &str = "BRANCH_NAME";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// `owner/name`, as GitHub reports it in `repository.full_name`.
    pub full_name: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub secret: String,
    pub script_path: String,
}

impl RepositoryConfig {
    /// Returns true if the binding can be matched, authenticated and deployed.
    pub fn is_usable(&self) -> bool {
        !self.full_name.is_empty() && !self.secret.is_empty() && !self.script_path.is_empty()
    }

    /// The branch pushes must target, if one is configured.
    pub fn branch_filter(&self) -> Option<&str> {
        self.branch.as_deref().filter(|b| !b.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeployConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Unset means deploy scripts may run for as long as they like.
    #[serde(default)]
    pub script_timeout_secs: Option<u64>,
    #[serde(default)]
    pub repository: Vec<RepositoryConfig>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            script_timeout_secs: None,
            repository: Vec::new(),
        }
    }
}

impl DeployConfig {
    pub fn new(repository: Vec<RepositoryConfig>) -> Self {
        Self {
            repository,
            ..Self::default()
        }
        .retain_usable()
    }

    pub fn script_timeout(&self) -> Option<Duration> {
        self.script_timeout_secs.map(Duration::from_secs)
    }

    /// First binding whose full name matches, in configuration order.
    pub fn find_repository(&self, full_name: &str) -> Option<&RepositoryConfig> {
        self.repository
            .iter()
            .find(|repo| repo.full_name == full_name)
    }

    /// Parses a TOML document with `[[repository]]` tables.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DeployConfig = toml::from_str(content)?;
        Ok(config.retain_usable())
    }

    /// Load and parse a TOML configuration file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| {
            DeployError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Builds the repository list from `REPO_FULL_NAME_<n>` style variables.
    ///
    /// Entries are read for `n = 1, 2, ...` until the first missing
    /// `REPO_FULL_NAME_<n>`. When there is no numbered entry at all, the
    /// unsuffixed single-repository variables are tried instead.
    pub fn from_env_source<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: String| get(&key).filter(|v| !v.is_empty());

        let mut repository = Vec::new();
        for n in 1.. {
            let Some(full_name) = lookup(format!("{REPO_FULL_NAME_VAR}_{n}")) else {
                break;
            };
            repository.push(RepositoryConfig {
                full_name,
                branch: lookup(format!("{BRANCH_NAME_VAR}_{n}")),
                secret: lookup(format!("{SECRET_VAR}_{n}")).unwrap_or_default(),
                script_path: lookup(format!("{SHELL_PATH_VAR}_{n}")).unwrap_or_default(),
            });
        }

        if repository.is_empty() {
            if let Some(full_name) = lookup(REPO_FULL_NAME_VAR.to_string()) {
                repository.push(RepositoryConfig {
                    full_name,
                    branch: lookup(BRANCH_NAME_VAR.to_string()),
                    secret: lookup(SECRET_VAR.to_string()).unwrap_or_default(),
                    script_path: lookup(SHELL_PATH_VAR.to_string()).unwrap_or_default(),
                });
            }
        }

        Ok(Self::new(repository))
    }

    /// Loads the configuration through an arbitrary variable source.
    ///
    /// A file named by `PUSH_DEPLOY_CONFIG` takes precedence over the
    /// numbered variables; `PORT` and `SCRIPT_TIMEOUT_SECS` apply either way.
    pub fn load_from<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match get(CONFIG_PATH_VAR).filter(|p| !p.is_empty()) {
            Some(path) => {
                info!("Using config at {:?}", path);
                Self::load_file(Path::new(&path))?
            }
            None => Self::from_env_source(&get)?,
        };

        if let Some(port) = get(PORT_VAR).filter(|v| !v.is_empty()) {
            config.port = port
                .parse()
                .map_err(|e| DeployError::Config(format!("Invalid {PORT_VAR} '{port}': {e}")))?;
        }
        if let Some(secs) = get(TIMEOUT_VAR).filter(|v| !v.is_empty()) {
            config.script_timeout_secs = Some(secs.parse().map_err(|e| {
                DeployError::Config(format!("Invalid {TIMEOUT_VAR} '{secs}': {e}"))
            })?);
        }
        if config.script_timeout_secs == Some(0) {
            return Err(DeployError::Config(
                "script timeout must be at least one second".to_string(),
            ));
        }

        if config.repository.is_empty() {
            warn!("No usable repository configured; every push will be ignored");
        }
        Ok(config)
    }

    /// Loads the configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    fn retain_usable(mut self) -> Self {
        self.repository.retain(|repo| {
            let usable = repo.is_usable();
            if !usable {
                warn!(
                    "Dropping repository '{}': name, secret and script path must all be set",
                    repo.full_name
                );
            }
            usable
        });
        self
    }
}

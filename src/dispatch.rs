//! Matches push events to repository bindings and triggers deploys.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::DeployConfig;
use crate::error::{DeployError, Result};
use crate::executor::{DeployExecutor, ExecutionReport};
use crate::signature::verify_signature;

/// The parts of a GitHub push payload the dispatcher looks at.
///
/// Missing fields default to empty; a nameless repository never matches.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PushEvent {
    #[serde(rename = "ref", default)]
    pub git_ref: String,
    #[serde(default)]
    pub repository: PushRepository,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PushRepository {
    #[serde(default)]
    pub full_name: String,
}

impl PushEvent {
    pub fn repository_full_name(&self) -> &str {
        &self.repository.full_name
    }
}

/// Non-error result of handling a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    IgnoredRepository(String),
    IgnoredBranch(String),
    Deployed {
        repository: String,
        report: ExecutionReport,
    },
}

impl DispatchOutcome {
    /// Plain-text response body.
    pub fn message(&self) -> String {
        match self {
            DispatchOutcome::IgnoredRepository(name) => {
                format!("Ignored push to repository: {}", name)
            }
            DispatchOutcome::IgnoredBranch(git_ref) => format!("Ignored push to branch: {}", git_ref),
            DispatchOutcome::Deployed { repository, .. } => format!("Deployed {}", repository),
        }
    }
}

/// Routes push payloads to the deploy script of the matching repository.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<DeployConfig>,
    executor: Arc<dyn DeployExecutor>,
}

impl Dispatcher {
    pub fn new(config: Arc<DeployConfig>, executor: Arc<dyn DeployExecutor>) -> Self {
        Self { config, executor }
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Parse, match, authenticate, filter by branch, then deploy.
    ///
    /// The repository is looked up before the signature is checked because
    /// the secret belongs to the repository. Unknown repositories are ignored
    /// without any authentication.
    pub async fn dispatch(&self, body: &[u8], signature: Option<&str>) -> Result<DispatchOutcome> {
        let event: PushEvent = serde_json::from_slice(body).map_err(|e| {
            info!("Could not parse JSON body: {}", e);
            DeployError::Payload(e)
        })?;
        let full_name = event.repository_full_name();

        let Some(repo) = self.config.find_repository(full_name) else {
            info!("Ignored push to repository: {}", full_name);
            return Ok(DispatchOutcome::IgnoredRepository(full_name.to_string()));
        };

        let authenticated = signature.is_some_and(|sig| verify_signature(body, &repo.secret, sig));
        if !authenticated {
            error!(
                "Signature verification failed for repository '{}' (header present: {})",
                repo.full_name,
                signature.is_some()
            );
            return Err(DeployError::Authentication);
        }

        // Refs look like `refs/heads/<branch>`; an empty ref is not filtered.
        let wrong_branch = repo.branch_filter().is_some_and(|branch| {
            !event.git_ref.is_empty() && !event.git_ref.ends_with(&format!("/{}", branch))
        });
        if wrong_branch {
            info!("Ignored push to branch: {}", event.git_ref);
            return Ok(DispatchOutcome::IgnoredBranch(event.git_ref));
        }

        info!(
            "Push event for repository '{}' ref '{}'. Running deploy script.",
            repo.full_name, event.git_ref
        );
        match self.executor.execute(&repo.script_path).await {
            Ok(report) => {
                info!("Deploy of '{}' completed successfully.", repo.full_name);
                Ok(DispatchOutcome::Deployed {
                    repository: repo.full_name.clone(),
                    report,
                })
            }
            Err(e) => {
                warn!("Deploy of '{}' failed", repo.full_name);
                Err(e)
            }
        }
    }
}

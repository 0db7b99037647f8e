mod dialect;
mod dto;
mod rest;
mod selector;
mod sonar;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{CodeQualitySnapshot, Project, QualityProfile};

pub use dialect::Dialect;
pub use rest::{Credentials, RestClient};
pub use selector::{resolve_version, DEFAULT_VERSION};
pub use sonar::SonarApiClient;

/// Uniform capability set satisfied by every API-generation dialect.
#[async_trait]
pub trait QualityClient {
    /// Fetches the full project catalogue, paginating transparently.
    /// Failures are logged and yield an empty catalogue.
    async fn projects(&self, instance_url: &str) -> Vec<Project>;

    /// Single-project lookup by key, `None` when it does not exist.
    async fn project(&self, project_key: &str, instance_url: &str) -> Option<Project>;

    /// Current metric values plus the most recent analysis timestamp and
    /// version. A missing analysis history is tolerated; a vanished
    /// project surfaces as `QualensError::NotFound`.
    async fn current_quality(&self, project: &Project) -> Result<CodeQualitySnapshot>;

    async fn quality_profiles(&self, instance_url: &str) -> Result<Vec<QualityProfile>>;

    /// Names of the projects associated with a profile, `None` when the
    /// profile has no associations.
    async fn profile_projects(
        &self,
        instance_url: &str,
        profile: &QualityProfile,
    ) -> Result<Option<Vec<String>>>;

    /// Raw changelog events for a profile.
    async fn profile_changes(
        &self,
        instance_url: &str,
        profile: &QualityProfile,
    ) -> Result<Vec<Value>>;
}

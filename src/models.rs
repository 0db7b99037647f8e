use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type CollectorId = u64;
pub type ProjectRecordId = u64;

pub const COLLECTOR_NAME: &str = "Sonar";

/// Upstream analysis/changelog dates look like `2017-04-18T17:15:29+0000`.
const ANALYSIS_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionError {
    pub code: String,
    pub message: String,
}

impl CollectionError {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// A project known to one upstream server. Discovered projects start out
/// disabled; the enabled flag tracks whether a dashboard component still
/// references the project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Option<ProjectRecordId>,
    pub collector_id: Option<CollectorId>,
    pub instance_url: String,
    pub project_id: Option<String>,
    pub project_name: String,
    pub description: String,
    pub nice_name: String,
    pub enabled: bool,
    /// Projects created through the push API are exempt from deletion.
    pub pushed: bool,
    pub last_updated: i64,
    pub errors: Vec<CollectionError>,
}

impl Project {
    pub fn discovered(instance_url: &str, project_id: Option<String>, project_name: String) -> Self {
        Self {
            id: None,
            collector_id: None,
            instance_url: instance_url.to_string(),
            project_id,
            project_name,
            description: String::new(),
            nice_name: String::new(),
            enabled: false,
            pushed: false,
            last_updated: 0,
            errors: Vec::new(),
        }
    }

    /// Reconciliation identity: two records describe the same upstream
    /// project when they live on the same server under the same name.
    /// The project identifier itself is subject to drift and is compared
    /// separately.
    pub fn matches(&self, other: &Project) -> bool {
        self.instance_url == other.instance_url && self.project_name == other.project_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityMetric {
    pub name: String,
    pub value: Option<String>,
    pub formatted_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityType {
    StaticAnalysis,
}

/// One timestamped capture of a project's quality metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeQualitySnapshot {
    pub project_record_id: Option<ProjectRecordId>,
    pub quality_type: QualityType,
    pub name: String,
    pub url: String,
    pub timestamp: i64,
    pub version: Option<String>,
    pub metrics: Vec<QualityMetric>,
}

pub fn dashboard_url(instance_url: &str, project_key: &str) -> String {
    format!("{instance_url}/dashboard/index/{project_key}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityProfile {
    pub key: String,
    pub name: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Created,
    Changed,
    Deleted,
}

impl Operation {
    pub fn from_action(action: &str) -> Self {
        match action {
            "DEACTIVATED" => Operation::Deleted,
            "ACTIVATED" => Operation::Created,
            _ => Operation::Changed,
        }
    }
}

/// One quality-profile changelog entry, keyed for deduplication by
/// (collector, author login, operation, timestamp).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfigChange {
    pub collector_id: CollectorId,
    pub user_name: Option<String>,
    pub user_login: Option<String>,
    pub operation: Operation,
    pub timestamp: i64,
    pub change: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collector {
    pub id: Option<CollectorId>,
    pub name: String,
    pub servers: Vec<String>,
    pub nice_names: Vec<String>,
    pub last_execution_record_count: usize,
    pub last_executed_seconds: i64,
}

impl Collector {
    pub fn prototype(servers: Vec<String>, nice_names: Vec<String>) -> Self {
        Self {
            id: None,
            name: COLLECTOR_NAME.to_string(),
            servers,
            nice_names,
            last_execution_record_count: 0,
            last_executed_seconds: 0,
        }
    }
}

/// Summary emitted after a CLI run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub collector: String,
    pub collected_at: DateTime<Utc>,
    pub servers: Vec<String>,
    pub projects_discovered: usize,
    pub enabled_projects: usize,
    pub snapshots_persisted: usize,
    pub elapsed_seconds: i64,
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parses an upstream analysis date into epoch millis, 0 when malformed.
pub fn parse_analysis_timestamp(date: &str) -> i64 {
    match DateTime::parse_from_str(date, ANALYSIS_DATE_FORMAT) {
        Ok(parsed) => parsed.timestamp_millis(),
        Err(e) => {
            error!("{date} is not in expected format {ANALYSIS_DATE_FORMAT}: {e}");
            0
        }
    }
}

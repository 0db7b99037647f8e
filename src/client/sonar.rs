use async_trait::async_trait;
use log::{error, info, warn};
use serde_json::Value;

use super::dialect::Dialect;
use super::dto::{
    AnalysesResponse, ChangelogResponse, ComponentDto, ComponentShowResponse, MeasureDto,
    MeasuresResponse, ProfileProjectsResponse, ProfilesResponse, ProjectPage,
};
use super::rest::{Credentials, RestClient};
use super::QualityClient;
use crate::error::{QualensError, Result};
use crate::format::format_metric;
use crate::models::{
    dashboard_url, parse_analysis_timestamp, CodeQualitySnapshot, Project, QualityMetric,
    QualityProfile, QualityType,
};
use crate::settings::Settings;

pub const DEFAULT_METRICS: &str = "ncloc,violations,new_vulnerabilities,critical_violations,major_violations,blocker_violations,tests,test_success_density,test_errors,test_failures,coverage,line_coverage,sqale_index,alert_status,quality_gate_details";

const PAGE_SIZE: u64 = 500;
/// Unauthenticated catalogue walks stop here to bound the load on
/// servers that were never given credentials.
const MAX_UNAUTHENTICATED_PAGES: u64 = 20;

/// One server's client: a dialect plus resolved credentials. Built fresh
/// for every server iteration of a run, so nothing on it is mutated after
/// construction.
pub struct SonarApiClient {
    rest: RestClient,
    dialect: Dialect,
    metrics: String,
}

impl SonarApiClient {
    pub fn new(dialect: Dialect, credentials: Credentials, settings: &Settings) -> Result<Self> {
        let metrics = settings
            .metrics
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_METRICS.to_string());
        let rest = RestClient::new(credentials, settings.request_read_timeout_ms)?;

        Ok(Self {
            rest,
            dialect,
            metrics,
        })
    }

    fn parse_project(&self, instance_url: &str, component: &ComponentDto) -> Project {
        Project::discovered(
            instance_url,
            component.project_id(self.dialect),
            component.name.clone().unwrap_or_default(),
        )
    }

    /// First request learns the total record count; catalogues larger
    /// than one page are then walked with `&p=N` and concatenated.
    async fn fetch_catalogue(&self, url: &str) -> Result<Vec<ComponentDto>> {
        let first: ProjectPage = self.rest.get_json(url).await?;
        let total = first.paging.map_or(0, |p| p.total);
        if total <= PAGE_SIZE {
            return Ok(first.components);
        }

        let mut pages = total.div_ceil(PAGE_SIZE);
        if !self.rest.has_token() {
            pages = pages.min(MAX_UNAUTHENTICATED_PAGES);
        }

        // the advertised total is untrusted input: no pre-reservation,
        // and an empty page ends the walk early
        let mut components = Vec::new();
        for page in 1..=pages {
            let page_url = format!("{url}&p={page}");
            let body: ProjectPage = self.rest.get_json(&page_url).await?;
            if body.components.is_empty() {
                break;
            }
            components.extend(body.components);
        }
        Ok(components)
    }

    async fn apply_latest_analysis(
        &self,
        snapshot: &mut CodeQualitySnapshot,
        instance_url: &str,
        project_key: &str,
    ) -> Result<()> {
        let url = format!("{instance_url}/api/project_analyses/search?project={project_key}");
        let body: AnalysesResponse = self.rest.get_json(&url).await?;

        let Some(latest) = body.analyses.first() else {
            // no analysis history yet, metrics alone are still useful
            return Ok(());
        };
        if let Some(date) = &latest.date {
            snapshot.timestamp = parse_analysis_timestamp(date);
        }
        for event in &latest.events {
            if event.category.as_deref() == Some("VERSION") {
                snapshot.version = event.name.clone();
            }
        }
        Ok(())
    }
}

fn parse_metric(measure: &MeasureDto) -> QualityMetric {
    let name = measure.metric.clone().unwrap_or_default();
    let formatted_value = measure.value.as_deref().map(|v| format_metric(&name, v));
    QualityMetric {
        name,
        value: measure.value.clone(),
        formatted_value,
    }
}

#[async_trait]
impl QualityClient for SonarApiClient {
    async fn projects(&self, instance_url: &str) -> Vec<Project> {
        let url = self.dialect.projects_url(instance_url, self.rest.has_token());
        match self.fetch_catalogue(&url).await {
            Ok(components) => {
                info!("fetched {} projects from {instance_url}", components.len());
                components
                    .iter()
                    .map(|c| self.parse_project(instance_url, c))
                    .collect()
            }
            Err(e) => {
                error!("could not fetch projects from {url}: {e}");
                Vec::new()
            }
        }
    }

    async fn project(&self, project_key: &str, instance_url: &str) -> Option<Project> {
        let url = format!("{instance_url}/api/components/show?component={project_key}");
        match self.rest.get_json::<ComponentShowResponse>(&url).await {
            Ok(body) => body.component.map(|component| {
                let mut project = self.parse_project(instance_url, &component);
                project.enabled = false;
                project.description = project.project_name.clone();
                project
            }),
            Err(e) => {
                error!("could not look up project from {url}: {e}");
                None
            }
        }
    }

    async fn current_quality(&self, project: &Project) -> Result<CodeQualitySnapshot> {
        let project_id = project
            .project_id
            .as_deref()
            .ok_or_else(|| QualensError::Api(format!("project {} has no identifier", project.project_name)))?;
        let url = self
            .dialect
            .measures_url(&project.instance_url, project_id, &self.metrics);

        let body: MeasuresResponse = self.rest.get_json(&url).await?;
        let component = body.component.ok_or_else(|| QualensError::Parse {
            url: url.clone(),
            message: "response carries no component".to_string(),
        })?;
        let project_key = component.key.clone().unwrap_or_default();

        let mut snapshot = CodeQualitySnapshot {
            project_record_id: None,
            quality_type: QualityType::StaticAnalysis,
            name: component.name.clone().unwrap_or_default(),
            url: dashboard_url(&project.instance_url, &project_key),
            timestamp: 0,
            version: None,
            metrics: component.measures.iter().map(parse_metric).collect(),
        };
        self.apply_latest_analysis(&mut snapshot, &project.instance_url, &project_key)
            .await?;

        Ok(snapshot)
    }

    async fn quality_profiles(&self, instance_url: &str) -> Result<Vec<QualityProfile>> {
        let url = format!("{instance_url}/api/qualityprofiles/search");
        let body: ProfilesResponse = self.rest.get_json(&url).await?;
        Ok(body
            .profiles
            .into_iter()
            .map(|p| QualityProfile {
                key: p.key.unwrap_or_default(),
                name: p.name,
                language: p.language,
            })
            .collect())
    }

    async fn profile_projects(
        &self,
        instance_url: &str,
        profile: &QualityProfile,
    ) -> Result<Option<Vec<String>>> {
        let url = format!(
            "{instance_url}/api/qualityprofiles/projects?key={}",
            profile.key
        );
        let body: ProfileProjectsResponse = self.rest.get_json(&url).await?;
        let names: Vec<String> = body.results.into_iter().filter_map(|r| r.name).collect();
        if names.is_empty() {
            warn!("profile {} has no associated projects", profile.key);
            return Ok(None);
        }
        Ok(Some(names))
    }

    async fn profile_changes(
        &self,
        instance_url: &str,
        profile: &QualityProfile,
    ) -> Result<Vec<Value>> {
        let url = self.dialect.changelog_url(instance_url, profile);
        let body: ChangelogResponse = self.rest.get_json(&url).await?;
        Ok(body.events)
    }
}

//! Typed decode of upstream responses. Field names vary across API
//! generations, so everything identifying is optional and the dialect
//! decides which field to read.

use serde::Deserialize;
use serde_json::Value;

use super::dialect::Dialect;

#[derive(Debug, Deserialize)]
pub struct Paging {
    pub total: u64,
}

/// One page of the project catalogue. Both the components search and the
/// authenticated projects search answer with a `components` array.
#[derive(Debug, Deserialize)]
pub struct ProjectPage {
    pub paging: Option<Paging>,
    #[serde(default)]
    pub components: Vec<ComponentDto>,
}

#[derive(Debug, Deserialize)]
pub struct ComponentDto {
    pub id: Option<String>,
    pub key: Option<String>,
    pub name: Option<String>,
}

impl ComponentDto {
    pub fn project_id(&self, dialect: Dialect) -> Option<String> {
        match dialect.project_id_field() {
            "key" => self.key.clone(),
            _ => self.id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ComponentShowResponse {
    pub component: Option<ComponentDto>,
}

#[derive(Debug, Deserialize)]
pub struct MeasuresResponse {
    pub component: Option<MeasuresComponent>,
}

#[derive(Debug, Deserialize)]
pub struct MeasuresComponent {
    pub key: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub measures: Vec<MeasureDto>,
}

#[derive(Debug, Deserialize)]
pub struct MeasureDto {
    pub metric: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysesResponse {
    #[serde(default)]
    pub analyses: Vec<AnalysisDto>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisDto {
    pub date: Option<String>,
    #[serde(default)]
    pub events: Vec<AnalysisEventDto>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisEventDto {
    pub category: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfilesResponse {
    #[serde(default)]
    pub profiles: Vec<ProfileDto>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileDto {
    pub key: Option<String>,
    pub name: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileProjectsResponse {
    #[serde(default)]
    pub results: Vec<NamedDto>,
}

#[derive(Debug, Deserialize)]
pub struct NamedDto {
    pub name: Option<String>,
}

/// Changelog events carry a freeform payload; they are kept raw and the
/// interesting fields are pulled defensively by the orchestrator.
#[derive(Debug, Deserialize)]
pub struct ChangelogResponse {
    #[serde(default)]
    pub events: Vec<Value>,
}

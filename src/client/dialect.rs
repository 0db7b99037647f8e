use crate::models::QualityProfile;

const URL_PROJECTS: &str = "/api/components/search?qualifiers=TRK&ps=500";
const URL_PROJECTS_AUTHENTICATED: &str = "/api/projects/search?ps=500";

/// The closed set of upstream API generations. Each variant carries its
/// own URL shapes and field names behind the uniform client capability;
/// selection is an explicit version-range dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Servers older than 6.3.
    Legacy,
    /// The 5.6 generation is a narrow exception matched by exact
    /// equality, not by the general pre-6.3 range.
    V56,
    /// [6.3, 8.0)
    V6,
    /// 8.0 and above.
    V8,
}

impl Dialect {
    #[allow(clippy::float_cmp)]
    pub fn select(version: Option<f64>) -> Dialect {
        match version {
            Some(v) if v == 5.6 => Dialect::V56,
            Some(v) if v >= 8.0 => Dialect::V8,
            Some(v) if v >= 6.3 => Dialect::V6,
            _ => Dialect::Legacy,
        }
    }

    /// Project catalogue endpoint. Token-authenticated access goes
    /// through the projects search, everything else through the public
    /// components search.
    pub fn projects_url(self, instance_url: &str, authenticated: bool) -> String {
        match self {
            Dialect::V6 | Dialect::V8 if authenticated => {
                format!("{instance_url}{URL_PROJECTS_AUTHENTICATED}")
            }
            _ => format!("{instance_url}{URL_PROJECTS}"),
        }
    }

    pub fn measures_url(self, instance_url: &str, project_id: &str, metric_keys: &str) -> String {
        match self {
            Dialect::V8 => format!(
                "{instance_url}/api/measures/component?component={project_id}&metricKeys={metric_keys}"
            ),
            _ => format!(
                "{instance_url}/api/measures/component?format=json&componentId={project_id}&metricKeys={metric_keys}&includealerts=true"
            ),
        }
    }

    /// Which catalogue field carries the project identifier.
    pub fn project_id_field(self) -> &'static str {
        match self {
            Dialect::V8 => "key",
            _ => "id",
        }
    }

    pub fn changelog_url(self, instance_url: &str, profile: &QualityProfile) -> String {
        match self {
            Dialect::V8 => format!(
                "{instance_url}/api/qualityprofiles/changelog?qualityProfile={}&language={}",
                profile.name.as_deref().unwrap_or_default(),
                profile.language.as_deref().unwrap_or_default()
            ),
            _ => format!(
                "{instance_url}/api/qualityprofiles/changelog?profileKey={}",
                profile.key
            ),
        }
    }
}

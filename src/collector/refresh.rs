use log::{error, info};
use url::Url;

use crate::client::{resolve_version, Credentials, Dialect, QualityClient, SonarApiClient};
use crate::error::QualensError;
use crate::models::{now_millis, CollectionError, CollectorId, Project, COLLECTOR_NAME};
use crate::repository::{CollectorRepository, ProjectRepository, SnapshotRepository};
use crate::settings::Settings;

/// Stores touched by an on-demand refresh.
pub struct RefreshStores<'a> {
    pub projects: &'a mut dyn ProjectRepository,
    pub snapshots: &'a mut dyn SnapshotRepository,
    pub collectors: &'a dyn CollectorRepository,
}

/// Refreshes quality data for a single project, resolved by name or by
/// upstream key. Unlike a scheduled run, the persisted snapshot is
/// stamped with "now" rather than the upstream analysis time. Returns a
/// human-readable status.
pub async fn refresh(
    settings: &Settings,
    stores: &mut RefreshStores<'_>,
    instance_url: Option<&str>,
    project_name: Option<&str>,
    project_key: Option<&str>,
) -> String {
    let Some(instance_url) = instance_url.filter(|u| Url::parse(u).is_ok()) else {
        return "instance url is invalid".to_string();
    };
    let Some(collector) = stores.collectors.find_by_name(COLLECTOR_NAME) else {
        return "quality collector not found".to_string();
    };
    let Some(collector_id) = collector.id else {
        return "quality collector not found".to_string();
    };

    let version = resolve_version(settings, instance_url).await;
    let dialect = Dialect::select(Some(version));
    let credentials = credentials_for(settings, instance_url);
    let client = match SonarApiClient::new(dialect, credentials, settings) {
        Ok(client) => client,
        Err(e) => return format!("could not build client for {instance_url}: {e}"),
    };

    let project_to_update = if let Some(name) = project_name {
        latest_by_name(stores.projects, collector_id, instance_url, name)
    } else if let Some(key) = project_key {
        match client.project(key, instance_url).await {
            // prefer the stored record, fall back to the freshly
            // discovered one so that pushed keys can be refreshed too
            Some(found) => latest_by_name(
                stores.projects,
                collector_id,
                &found.instance_url,
                &found.project_name,
            )
            .or(Some(found)),
            None => None,
        }
    } else {
        None
    };

    let Some(mut project) = project_to_update else {
        return format!(
            "no records found for projectName={} projectKey={} instanceUrl={instance_url}",
            project_name.unwrap_or(""),
            project_key.unwrap_or("")
        );
    };

    update_quality_data(stores, collector_id, &client, &mut project).await;
    format!(
        "successfully refreshed project: projectName={} projectKey={}",
        project_name.unwrap_or(""),
        project_key.unwrap_or("")
    )
}

/// Credentials configured for this server, located by case-insensitive
/// URL match over the parallel settings lists.
fn credentials_for(settings: &Settings, instance_url: &str) -> Credentials {
    let index = settings
        .servers
        .iter()
        .position(|s| s.eq_ignore_ascii_case(instance_url));
    match index {
        Some(i) => Credentials::resolve(
            settings.username(i),
            settings.password(i),
            settings.token(i),
        ),
        None => Credentials::default(),
    }
}

fn latest_by_name(
    projects: &dyn ProjectRepository,
    collector_id: CollectorId,
    instance_url: &str,
    project_name: &str,
) -> Option<Project> {
    projects
        .find_by_name(collector_id, instance_url, project_name)
        .into_iter()
        .max_by_key(|p| p.last_updated)
}

async fn update_quality_data<C: QualityClient>(
    stores: &mut RefreshStores<'_>,
    collector_id: CollectorId,
    client: &C,
    project: &mut Project,
) {
    match client.current_quality(project).await {
        Ok(mut snapshot) => {
            project.last_updated = now_millis();
            project.collector_id = Some(collector_id);
            stores.projects.save(project);
            snapshot.project_record_id = project.id;
            snapshot.timestamp = now_millis();
            stores.snapshots.save(snapshot);
        }
        Err(QualensError::NotFound(_)) => {
            project.enabled = false;
            project.last_updated = now_millis();
            project.errors.push(CollectionError::new(
                "404",
                "disabled as the project no longer exists upstream",
            ));
            stores.projects.save(project);
            info!(
                "disabled after upstream 404, projectName={} instanceUrl={}",
                project.project_name, project.instance_url
            );
        }
        Err(QualensError::Parse { message, url }) => {
            project.errors.push(CollectionError::new("500", &message));
            stores.projects.save(project);
            error!("could not parse response from {url}: {message}");
        }
        Err(e) => {
            error!("quality refresh failed for {}: {e}", project.project_name);
        }
    }
}

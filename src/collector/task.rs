use std::time::Instant;

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::client::{resolve_version, Credentials, Dialect, QualityClient, SonarApiClient};
use crate::error::QualensError;
use crate::models::{
    now_millis, parse_analysis_timestamp, CodeQualitySnapshot, CollectionError, Collector,
    CollectorId, Operation, ProfileConfigChange, Project,
};
use crate::repository::{
    CollectorRepository, ComponentRepository, ProfileRepository, ProjectRepository,
    SnapshotRepository,
};
use crate::settings::Settings;

/// Changelog APIs do not exist below this server version.
const PROFILE_CHANGELOG_MIN_VERSION: f64 = 5.0;

/// Drives one collection run: per configured server, fetch the project
/// catalogue, reconcile it against stored state, refresh quality data for
/// enabled projects and collect quality-profile changes. Servers are
/// independent units of work; a failure on one never aborts the others.
pub struct CollectorTask<'a> {
    settings: &'a Settings,
    projects: &'a mut dyn ProjectRepository,
    snapshots: &'a mut dyn SnapshotRepository,
    profiles: &'a mut dyn ProfileRepository,
    components: &'a mut dyn ComponentRepository,
    collectors: &'a mut dyn CollectorRepository,
}

impl<'a> CollectorTask<'a> {
    pub fn new(
        settings: &'a Settings,
        projects: &'a mut dyn ProjectRepository,
        snapshots: &'a mut dyn SnapshotRepository,
        profiles: &'a mut dyn ProfileRepository,
        components: &'a mut dyn ComponentRepository,
        collectors: &'a mut dyn CollectorRepository,
    ) -> Self {
        Self {
            settings,
            projects,
            snapshots,
            profiles,
            components,
            collectors,
        }
    }

    pub async fn collect(&mut self, collector: &mut Collector) {
        let start = Instant::now();
        let Some(collector_id) = collector.id else {
            warn!("collector has not been persisted yet, skipping run");
            return;
        };

        let mut total_project_count = 0;
        let mut existing_projects = self.projects.find_by_collector(collector_id);
        let mut latest_projects: Vec<Project> = Vec::new();

        for (index, instance_url) in collector.servers.clone().iter().enumerate() {
            info!("collecting {instance_url}");

            let version = resolve_version(self.settings, instance_url).await;
            let dialect = Dialect::select(Some(version));
            let credentials = Credentials::resolve(
                self.settings.username(index),
                self.settings.password(index),
                self.settings.token(index),
            );
            let client = match SonarApiClient::new(dialect, credentials, self.settings) {
                Ok(client) => client,
                Err(e) => {
                    error!("could not build client for {instance_url}: {e}");
                    continue;
                }
            };

            let fetched = client.projects(instance_url).await;
            latest_projects.extend(fetched.iter().cloned());

            self.add_new_projects(&fetched, &mut existing_projects, collector, collector_id);

            let enabled = self.projects.find_enabled(collector_id, instance_url);
            total_project_count += enabled.len();
            self.refresh_data(enabled, &client).await;

            if version >= PROFILE_CHANGELOG_MIN_VERSION {
                if let Err(e) = self
                    .fetch_profile_config_changes(collector_id, instance_url, &client)
                    .await
                {
                    error!("profile changelog collection failed for {instance_url}: {e}");
                }
            }
        }

        // refresh_data saved newer records than the run-start snapshot;
        // lifecycle passes must not write that snapshot back
        let mut existing_projects = self.projects.find_by_collector(collector_id);
        self.clean(collector_id, &mut existing_projects);
        self.delete_unwanted(&latest_projects, &existing_projects, collector, collector_id);

        let elapsed_seconds = start.elapsed().as_secs() as i64;
        info!(
            "collect stop, total_process_seconds={elapsed_seconds}, total_project_count={total_project_count}"
        );
        collector.last_execution_record_count = total_project_count;
        collector.last_executed_seconds = elapsed_seconds;
        self.collectors.save(collector);
    }

    /// Reconciles the fetched catalogue against stored state. Every index
    /// match is examined for drift, not just the first, so that nice-name
    /// backfill reaches all duplicates.
    // TODO: the matching below is O(fetched x existing); fine for the
    // catalogue sizes seen so far.
    fn add_new_projects(
        &mut self,
        fetched: &[Project],
        existing: &mut Vec<Project>,
        collector: &Collector,
        collector_id: CollectorId,
    ) {
        let start = Instant::now();
        let mut new_count = 0;
        let mut updated_count = 0;
        let mut new_projects = Vec::new();
        let mut updated_projects = Vec::new();

        for project in fetched {
            let nice_name = nice_name_for(collector, &project.instance_url);
            let matches: Vec<usize> = existing
                .iter()
                .enumerate()
                .filter(|(_, stored)| stored.matches(project))
                .map(|(i, _)| i)
                .collect();

            if matches.is_empty() {
                let mut fresh = project.clone();
                fresh.collector_id = Some(collector_id);
                fresh.enabled = false;
                fresh.description = fresh.project_name.clone();
                fresh.nice_name = nice_name.clone();
                info!(
                    "NewProject projectName={} projectId={} enabled=false",
                    fresh.project_name,
                    fresh.project_id.as_deref().unwrap_or("")
                );
                new_projects.push(fresh);
                new_count += 1;
                continue;
            }

            for index in matches {
                let stored = &mut existing[index];
                if stored.project_id.is_none() {
                    info!("projectId is missing for project={}", stored.project_name);
                }
                let id_drift =
                    stored.project_id.is_some() && stored.project_id != project.project_id;
                let nice_name_drift = stored.nice_name != nice_name;
                if id_drift || nice_name_drift {
                    info!(
                        "UpdatedProject projectName={} projectId={} enabled={}",
                        project.project_name,
                        stored.project_id.as_deref().unwrap_or(""),
                        stored.enabled
                    );
                    stored.errors.clear();
                    stored.project_id = project.project_id.clone();
                    if stored.nice_name.is_empty() {
                        stored.nice_name = nice_name.clone();
                    }
                    updated_projects.push(stored.clone());
                    updated_count += 1;
                }
            }
        }

        if !new_projects.is_empty() {
            self.projects.save_all(&mut new_projects);
            existing.extend(new_projects);
        }
        if !updated_projects.is_empty() {
            self.projects.save_all(&mut updated_projects);
        }
        info!(
            "add_new_projects fetched={} existing={} new={new_count} updated={updated_count} elapsed_ms={}",
            fetched.len(),
            existing.len(),
            start.elapsed().as_millis()
        );
    }

    /// Refreshes quality data for the stored enabled projects of one
    /// server. A vanished project is disabled with a "404" error and not
    /// retried; a malformed response stamps a "500" error but leaves the
    /// project enabled.
    async fn refresh_data<C: QualityClient>(&mut self, projects: Vec<Project>, client: &C) {
        let start = Instant::now();
        let mut total = 0;
        let mut updated = 0;
        let mut disabled = 0;

        for mut project in projects {
            match client.current_quality(&project).await {
                Ok(snapshot) => {
                    if self.is_new_snapshot(&project, &snapshot) {
                        project.last_updated = now_millis();
                        self.projects.save(&mut project);
                        let mut snapshot = snapshot;
                        snapshot.project_record_id = project.id;
                        self.snapshots.save(snapshot);
                        updated += 1;
                    }
                }
                Err(QualensError::NotFound(_)) => {
                    project.enabled = false;
                    project.last_updated = now_millis();
                    project.errors.push(CollectionError::new(
                        "404",
                        "disabled as the project no longer exists upstream",
                    ));
                    self.projects.save(&mut project);
                    info!(
                        "disabled after upstream 404, projectName={} projectId={}",
                        project.project_name,
                        project.project_id.as_deref().unwrap_or("")
                    );
                    disabled += 1;
                }
                Err(QualensError::Parse { message, url }) => {
                    project
                        .errors
                        .push(CollectionError::new("500", &message));
                    self.projects.save(&mut project);
                    error!("could not parse response from {url}: {message}");
                }
                Err(e) => {
                    error!("quality refresh failed for {}: {e}", project.project_name);
                }
            }
            total += 1;
        }
        info!(
            "refresh_data total={total} updated={updated} disabled={disabled} elapsed_ms={}",
            start.elapsed().as_millis()
        );
    }

    fn is_new_snapshot(&self, project: &Project, snapshot: &CodeQualitySnapshot) -> bool {
        let Some(project_record_id) = project.id else {
            return true;
        };
        self.snapshots
            .find_by_project_and_timestamp(project_record_id, snapshot.timestamp)
            .is_none()
    }

    async fn fetch_profile_config_changes<C: QualityClient>(
        &mut self,
        collector_id: CollectorId,
        instance_url: &str,
        client: &C,
    ) -> crate::error::Result<()> {
        let profiles = client.quality_profiles(instance_url).await?;
        for profile in profiles {
            // profiles nobody uses produce no changelog entries
            let associated = client.profile_projects(instance_url, &profile).await?;
            if associated.is_none() {
                continue;
            }
            let events = client.profile_changes(instance_url, &profile).await?;
            self.add_new_config_changes(collector_id, events);
        }
        Ok(())
    }

    fn add_new_config_changes(&mut self, collector_id: CollectorId, events: Vec<Value>) {
        let mut changes = Vec::new();
        for event in events {
            let user_name = string_field(&event, "authorName");
            let user_login = string_field(&event, "authorLogin");
            let action = string_field(&event, "action").unwrap_or_default();
            let operation = Operation::from_action(&action);
            let timestamp = string_field(&event, "date")
                .map(|d| parse_analysis_timestamp(&d))
                .unwrap_or(0);

            if !self
                .profiles
                .exists(collector_id, user_login.as_deref(), operation, timestamp)
            {
                changes.push(ProfileConfigChange {
                    collector_id,
                    user_name,
                    user_login,
                    operation,
                    timestamp,
                    change: event,
                });
            }
        }
        self.profiles.save_all(changes);
    }

    /// Aligns the enabled flag with dashboard references: a referenced,
    /// error-free project becomes enabled; an unreferenced one is
    /// disabled.
    fn clean(&mut self, collector_id: CollectorId, existing: &mut [Project]) {
        let referenced = self.components.referenced_project_ids(collector_id);
        let mut changed = Vec::new();

        for project in existing.iter_mut() {
            let Some(id) = project.id else { continue };
            let flip = if project.enabled {
                !referenced.contains(&id)
            } else {
                referenced.contains(&id) && project.errors.is_empty()
            };
            if flip {
                project.enabled = !project.enabled;
                info!(
                    "ChangeProjectStatus projectName={} projectId={} enabled={}",
                    project.project_name,
                    project.project_id.as_deref().unwrap_or(""),
                    project.enabled
                );
                changed.push(project.clone());
            }
        }
        if !changed.is_empty() {
            self.projects.save_all(&mut changed);
        }
    }

    /// Drops stored projects whose server left the configured set or that
    /// vanished from the latest catalogue. Pushed projects are exempt;
    /// enabled ones are unlinked from their dashboard components first.
    fn delete_unwanted(
        &mut self,
        latest: &[Project],
        existing: &[Project],
        collector: &Collector,
        collector_id: CollectorId,
    ) {
        let mut delete_ids = Vec::new();
        for project in existing {
            if project.pushed {
                continue;
            }
            let Some(id) = project.id else { continue };
            let still_configured = collector.servers.contains(&project.instance_url);
            let owned = project.collector_id == Some(collector_id);
            let in_latest = latest.iter().any(|l| l.matches(project));
            if !still_configured || !owned || !in_latest {
                if project.enabled {
                    debug!("dropping deleted project which is enabled {}", project.project_name);
                    self.components.unlink(id);
                } else {
                    debug!("dropping deleted project which is disabled {}", project.project_name);
                }
                delete_ids.push(id);
            }
        }
        if !delete_ids.is_empty() {
            self.projects.delete_all(&delete_ids);
        }
    }
}

fn string_field(event: &Value, field: &str) -> Option<String> {
    event.get(field).and_then(Value::as_str).map(str::to_owned)
}

/// Case-insensitive server to nice-name lookup over the parallel
/// configuration lists.
fn nice_name_for(collector: &Collector, instance_url: &str) -> String {
    if collector.servers.is_empty() || collector.nice_names.is_empty() {
        return String::new();
    }
    for (i, server) in collector.servers.iter().enumerate() {
        if server.eq_ignore_ascii_case(instance_url) && collector.nice_names.len() > i {
            return collector.nice_names[i].clone();
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        MemoryCollectorRepository, MemoryComponentRepository, MemoryProfileRepository,
        MemoryProjectRepository, MemorySnapshotRepository,
    };

    struct Stores {
        projects: MemoryProjectRepository,
        snapshots: MemorySnapshotRepository,
        profiles: MemoryProfileRepository,
        components: MemoryComponentRepository,
        collectors: MemoryCollectorRepository,
    }

    impl Stores {
        fn new() -> Self {
            Self {
                projects: MemoryProjectRepository::default(),
                snapshots: MemorySnapshotRepository::default(),
                profiles: MemoryProfileRepository::default(),
                components: MemoryComponentRepository::default(),
                collectors: MemoryCollectorRepository::default(),
            }
        }

        async fn run(&mut self, settings: &Settings, collector: &mut Collector) {
            let mut task = CollectorTask::new(
                settings,
                &mut self.projects,
                &mut self.snapshots,
                &mut self.profiles,
                &mut self.components,
                &mut self.collectors,
            );
            task.collect(collector).await;
        }
    }

    fn settings_for(server_url: &str) -> Settings {
        Settings {
            servers: vec![server_url.to_string()],
            metrics: Some("ncloc".to_string()),
            ..Settings::default()
        }
    }

    fn saved_collector(stores: &mut Stores, server_url: &str) -> Collector {
        let mut collector =
            Collector::prototype(vec![server_url.to_string()], vec!["Team A".to_string()]);
        stores.collectors.save(&mut collector);
        collector
    }

    async fn mock_common(server: &mut mockito::Server, components: serde_json::Value) {
        server
            .mock("GET", "/api/server/version")
            .with_body("6.3")
            .create_async()
            .await;
        server
            .mock("GET", "/api/components/search?qualifiers=TRK&ps=500")
            .with_body(
                serde_json::json!({
                    "paging": {"total": components.as_array().map_or(0, Vec::len)},
                    "components": components
                })
                .to_string(),
            )
            .create_async()
            .await;
    }

    async fn mock_empty_profiles(server: &mut mockito::Server) {
        server
            .mock("GET", "/api/qualityprofiles/search")
            .with_body(r#"{"profiles": []}"#)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_discovery_inserts_disabled_projects_with_nice_name() {
        let mut server = mockito::Server::new_async().await;
        mock_common(
            &mut server,
            serde_json::json!([
                {"id": "id-1", "name": "proj-a"},
                {"id": "id-2", "name": "proj-b"}
            ]),
        )
        .await;
        mock_empty_profiles(&mut server).await;

        let mut stores = Stores::new();
        let settings = settings_for(&server.url());
        let mut collector = saved_collector(&mut stores, &server.url());

        stores.run(&settings, &mut collector).await;

        let stored = stores.projects.all();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|p| !p.enabled));
        assert!(stored.iter().all(|p| p.nice_name == "Team A"));
        assert_eq!(stored[0].description, "proj-a");
    }

    #[tokio::test]
    async fn test_reconciliation_is_idempotent() {
        let mut server = mockito::Server::new_async().await;
        mock_common(
            &mut server,
            serde_json::json!([{"id": "id-1", "name": "proj-a"}]),
        )
        .await;
        mock_empty_profiles(&mut server).await;

        let mut stores = Stores::new();
        let settings = settings_for(&server.url());
        let mut collector = saved_collector(&mut stores, &server.url());

        stores.run(&settings, &mut collector).await;
        let after_first: Vec<_> = stores.projects.all().to_vec();

        stores.run(&settings, &mut collector).await;
        let after_second = stores.projects.all();

        assert_eq!(after_first.len(), after_second.len());
        for (a, b) in after_first.iter().zip(after_second.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.project_id, b.project_id);
            assert_eq!(a.nice_name, b.nice_name);
            assert_eq!(a.last_updated, b.last_updated);
        }
    }

    #[tokio::test]
    async fn test_drift_updates_project_id_and_clears_errors() {
        let mut server = mockito::Server::new_async().await;
        mock_common(
            &mut server,
            serde_json::json!([{"id": "id-new", "name": "proj-a"}]),
        )
        .await;
        mock_empty_profiles(&mut server).await;

        let mut stores = Stores::new();
        let settings = settings_for(&server.url());
        let mut collector = saved_collector(&mut stores, &server.url());
        let collector_id = collector.id.unwrap();

        // stored under a stale upstream identifier, with an old error
        let mut stale =
            Project::discovered(&server.url(), Some("id-old".into()), "proj-a".into());
        stale.collector_id = Some(collector_id);
        stale.nice_name = "Team A".into();
        stale.errors.push(CollectionError::new("500", "old failure"));
        stores.projects.save(&mut stale);

        stores.run(&settings, &mut collector).await;

        let stored = stores
            .projects
            .find_by_natural_key(collector_id, &server.url(), "id-new")
            .unwrap();
        assert!(stored.errors.is_empty());
        assert_eq!(stored.id, stale.id);
    }

    #[tokio::test]
    async fn test_not_found_disables_project_and_appends_error() {
        let mut server = mockito::Server::new_async().await;
        mock_common(
            &mut server,
            serde_json::json!([{"id": "id-1", "name": "proj-a"}]),
        )
        .await;
        server
            .mock(
                "GET",
                "/api/measures/component?format=json&componentId=id-1&metricKeys=ncloc&includealerts=true",
            )
            .with_status(404)
            .create_async()
            .await;
        mock_empty_profiles(&mut server).await;

        let mut stores = Stores::new();
        let settings = settings_for(&server.url());
        let mut collector = saved_collector(&mut stores, &server.url());
        let collector_id = collector.id.unwrap();

        let mut project =
            Project::discovered(&server.url(), Some("id-1".into()), "proj-a".into());
        project.collector_id = Some(collector_id);
        project.nice_name = "Team A".into();
        project.enabled = true;
        project.errors.push(CollectionError::new("500", "earlier"));
        stores.projects.save(&mut project);
        stores.components.link(project.id.unwrap());

        stores.run(&settings, &mut collector).await;

        let stored = stores
            .projects
            .find_by_natural_key(collector_id, &server.url(), "id-1")
            .unwrap();
        assert!(!stored.enabled);
        let codes: Vec<_> = stored.errors.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["500", "404"]);
        assert_eq!(stores.snapshots.count(), 0);
    }

    #[tokio::test]
    async fn test_unreferenced_project_keeps_404_error_through_lifecycle() {
        let mut server = mockito::Server::new_async().await;
        mock_common(
            &mut server,
            serde_json::json!([{"id": "id-1", "name": "proj-a"}]),
        )
        .await;
        server
            .mock(
                "GET",
                "/api/measures/component?format=json&componentId=id-1&metricKeys=ncloc&includealerts=true",
            )
            .with_status(404)
            .create_async()
            .await;
        mock_empty_profiles(&mut server).await;

        let mut stores = Stores::new();
        let settings = settings_for(&server.url());
        let mut collector = saved_collector(&mut stores, &server.url());
        let collector_id = collector.id.unwrap();

        // enabled but not referenced by any dashboard component, so the
        // lifecycle pass also wants to disable it
        let mut project =
            Project::discovered(&server.url(), Some("id-1".into()), "proj-a".into());
        project.collector_id = Some(collector_id);
        project.nice_name = "Team A".into();
        project.enabled = true;
        stores.projects.save(&mut project);

        stores.run(&settings, &mut collector).await;

        let stored = stores
            .projects
            .find_by_natural_key(collector_id, &server.url(), "id-1")
            .unwrap();
        assert!(!stored.enabled);
        let codes: Vec<_> = stored.errors.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["404"]);
    }

    #[tokio::test]
    async fn test_parse_error_stamps_500_without_disabling() {
        let mut server = mockito::Server::new_async().await;
        mock_common(
            &mut server,
            serde_json::json!([{"id": "id-1", "name": "proj-a"}]),
        )
        .await;
        server
            .mock(
                "GET",
                "/api/measures/component?format=json&componentId=id-1&metricKeys=ncloc&includealerts=true",
            )
            .with_body("<html>down for maintenance</html>")
            .create_async()
            .await;
        mock_empty_profiles(&mut server).await;

        let mut stores = Stores::new();
        let settings = settings_for(&server.url());
        let mut collector = saved_collector(&mut stores, &server.url());
        let collector_id = collector.id.unwrap();

        let mut project =
            Project::discovered(&server.url(), Some("id-1".into()), "proj-a".into());
        project.collector_id = Some(collector_id);
        project.nice_name = "Team A".into();
        project.enabled = true;
        stores.projects.save(&mut project);
        stores.components.link(project.id.unwrap());

        stores.run(&settings, &mut collector).await;

        let stored = stores
            .projects
            .find_by_natural_key(collector_id, &server.url(), "id-1")
            .unwrap();
        assert!(stored.enabled);
        assert_eq!(stored.errors.len(), 1);
        assert_eq!(stored.errors[0].code, "500");
    }

    #[tokio::test]
    async fn test_snapshot_timestamp_dedup() {
        let mut server = mockito::Server::new_async().await;
        mock_common(
            &mut server,
            serde_json::json!([{"id": "id-1", "name": "proj-a"}]),
        )
        .await;
        server
            .mock(
                "GET",
                "/api/measures/component?format=json&componentId=id-1&metricKeys=ncloc&includealerts=true",
            )
            .with_body(
                serde_json::json!({"component": {"key": "proj:a", "name": "proj-a",
                    "measures": [{"metric": "ncloc", "value": "10"}]}})
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/api/project_analyses/search?project=proj:a")
            .with_body(
                serde_json::json!({"analyses": [{"date": "2017-04-18T17:15:29+0000", "events": []}]})
                    .to_string(),
            )
            .create_async()
            .await;
        mock_empty_profiles(&mut server).await;

        let mut stores = Stores::new();
        let settings = settings_for(&server.url());
        let mut collector = saved_collector(&mut stores, &server.url());
        let collector_id = collector.id.unwrap();

        let mut project =
            Project::discovered(&server.url(), Some("id-1".into()), "proj-a".into());
        project.collector_id = Some(collector_id);
        project.nice_name = "Team A".into();
        project.enabled = true;
        stores.projects.save(&mut project);
        stores.components.link(project.id.unwrap());

        stores.run(&settings, &mut collector).await;
        stores.run(&settings, &mut collector).await;

        // same upstream analysis timestamp twice, one persisted snapshot
        assert_eq!(stores.snapshots.count(), 1);
    }

    #[tokio::test]
    async fn test_profile_changes_deduped_and_mapped() {
        let mut server = mockito::Server::new_async().await;
        mock_common(
            &mut server,
            serde_json::json!([{"id": "id-1", "name": "proj-a"}]),
        )
        .await;
        server
            .mock("GET", "/api/qualityprofiles/search")
            .with_body(
                serde_json::json!({"profiles": [
                    {"key": "java-sonar-way", "name": "Sonar way", "language": "java"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/api/qualityprofiles/projects?key=java-sonar-way")
            .with_body(r#"{"results": [{"name": "proj-a"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/qualityprofiles/changelog?profileKey=java-sonar-way")
            .with_body(
                serde_json::json!({"events": [
                    {"authorName": "Alice", "authorLogin": "alice",
                     "action": "ACTIVATED", "date": "2017-04-18T17:15:29+0000"},
                    {"authorName": "Bob", "authorLogin": "bob",
                     "action": "DEACTIVATED", "date": "2017-04-19T09:00:00+0000"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let mut stores = Stores::new();
        let settings = settings_for(&server.url());
        let mut collector = saved_collector(&mut stores, &server.url());

        stores.run(&settings, &mut collector).await;
        stores.run(&settings, &mut collector).await;

        let changes = stores.profiles.all();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].operation, Operation::Created);
        assert_eq!(changes[0].user_login.as_deref(), Some("alice"));
        assert_eq!(changes[1].operation, Operation::Deleted);
    }

    #[tokio::test]
    async fn test_vanished_disabled_project_is_deleted() {
        let mut server = mockito::Server::new_async().await;
        mock_common(&mut server, serde_json::json!([])).await;
        mock_empty_profiles(&mut server).await;

        let mut stores = Stores::new();
        let settings = settings_for(&server.url());
        let mut collector = saved_collector(&mut stores, &server.url());
        let collector_id = collector.id.unwrap();

        let mut gone =
            Project::discovered(&server.url(), Some("id-gone".into()), "proj-gone".into());
        gone.collector_id = Some(collector_id);
        stores.projects.save(&mut gone);

        let mut pushed =
            Project::discovered(&server.url(), Some("id-push".into()), "proj-push".into());
        pushed.collector_id = Some(collector_id);
        pushed.pushed = true;
        stores.projects.save(&mut pushed);

        stores.run(&settings, &mut collector).await;

        let remaining = stores.projects.all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].project_name, "proj-push");
    }

    #[tokio::test]
    async fn test_run_statistics_recorded() {
        let mut server = mockito::Server::new_async().await;
        mock_common(
            &mut server,
            serde_json::json!([{"id": "id-1", "name": "proj-a"}]),
        )
        .await;
        mock_empty_profiles(&mut server).await;

        let mut stores = Stores::new();
        let settings = settings_for(&server.url());
        let mut collector = saved_collector(&mut stores, &server.url());

        stores.run(&settings, &mut collector).await;

        assert_eq!(collector.last_execution_record_count, 0);
        assert!(collector.last_executed_seconds >= 0);
        let stored = stores.collectors.find_by_name("Sonar").unwrap();
        assert_eq!(stored.last_execution_record_count, 0);
    }

    #[tokio::test]
    async fn test_empty_server_list_is_a_no_op() {
        let mut stores = Stores::new();
        let settings = Settings::default();
        let mut collector = Collector::prototype(Vec::new(), Vec::new());
        stores.collectors.save(&mut collector);

        stores.run(&settings, &mut collector).await;

        assert!(stores.projects.all().is_empty());
        assert_eq!(stores.snapshots.count(), 0);
    }

    #[test]
    fn test_nice_name_lookup_is_case_insensitive() {
        let collector = Collector::prototype(
            vec!["http://Sonar.One".to_string()],
            vec!["Team A".to_string()],
        );
        assert_eq!(nice_name_for(&collector, "http://sonar.one"), "Team A");
        assert_eq!(nice_name_for(&collector, "http://sonar.two"), "");
    }
}

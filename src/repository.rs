//! Storage contracts consumed by the collection pipeline. The backing
//! store is an external collaborator; these traits capture its query
//! shapes, and the in-memory implementations back the CLI and tests.

use std::collections::HashSet;

use crate::models::{
    CodeQualitySnapshot, Collector, CollectorId, Operation, ProfileConfigChange, Project,
    ProjectRecordId,
};

pub trait ProjectRepository {
    fn find_by_collector(&self, collector_id: CollectorId) -> Vec<Project>;
    fn find_by_natural_key(
        &self,
        collector_id: CollectorId,
        instance_url: &str,
        project_id: &str,
    ) -> Option<Project>;
    fn find_by_name(
        &self,
        collector_id: CollectorId,
        instance_url: &str,
        project_name: &str,
    ) -> Vec<Project>;
    fn find_enabled(&self, collector_id: CollectorId, instance_url: &str) -> Vec<Project>;
    /// Inserts or updates one project, assigning a record id on insert.
    fn save(&mut self, project: &mut Project);
    fn save_all(&mut self, projects: &mut [Project]);
    fn delete_all(&mut self, ids: &[ProjectRecordId]);
}

pub trait SnapshotRepository {
    fn find_by_project_and_timestamp(
        &self,
        project_record_id: ProjectRecordId,
        timestamp: i64,
    ) -> Option<CodeQualitySnapshot>;
    fn save(&mut self, snapshot: CodeQualitySnapshot);
    fn count(&self) -> usize;
}

pub trait ProfileRepository {
    /// Dedup lookup over (collector, author login, operation, timestamp).
    fn exists(
        &self,
        collector_id: CollectorId,
        user_login: Option<&str>,
        operation: Operation,
        timestamp: i64,
    ) -> bool;
    fn save_all(&mut self, changes: Vec<ProfileConfigChange>);
}

pub trait CollectorRepository {
    fn find_by_name(&self, name: &str) -> Option<Collector>;
    fn save(&mut self, collector: &mut Collector);
}

/// Dashboard-side component references: which stored projects are wired
/// into a dashboard. Drives the enable/disable lifecycle.
pub trait ComponentRepository {
    fn referenced_project_ids(&self, collector_id: CollectorId) -> HashSet<ProjectRecordId>;
    fn unlink(&mut self, project_record_id: ProjectRecordId);
}

#[derive(Debug, Default)]
pub struct MemoryProjectRepository {
    projects: Vec<Project>,
    next_id: ProjectRecordId,
}

impl MemoryProjectRepository {
    pub fn all(&self) -> &[Project] {
        &self.projects
    }
}

impl ProjectRepository for MemoryProjectRepository {
    fn find_by_collector(&self, collector_id: CollectorId) -> Vec<Project> {
        self.projects
            .iter()
            .filter(|p| p.collector_id == Some(collector_id))
            .cloned()
            .collect()
    }

    fn find_by_natural_key(
        &self,
        collector_id: CollectorId,
        instance_url: &str,
        project_id: &str,
    ) -> Option<Project> {
        self.projects
            .iter()
            .find(|p| {
                p.collector_id == Some(collector_id)
                    && p.instance_url == instance_url
                    && p.project_id.as_deref() == Some(project_id)
            })
            .cloned()
    }

    fn find_by_name(
        &self,
        collector_id: CollectorId,
        instance_url: &str,
        project_name: &str,
    ) -> Vec<Project> {
        self.projects
            .iter()
            .filter(|p| {
                p.collector_id == Some(collector_id)
                    && p.instance_url == instance_url
                    && p.project_name == project_name
            })
            .cloned()
            .collect()
    }

    fn find_enabled(&self, collector_id: CollectorId, instance_url: &str) -> Vec<Project> {
        self.projects
            .iter()
            .filter(|p| {
                p.collector_id == Some(collector_id)
                    && p.instance_url == instance_url
                    && p.enabled
            })
            .cloned()
            .collect()
    }

    fn save(&mut self, project: &mut Project) {
        match project.id {
            Some(id) => {
                if let Some(stored) = self.projects.iter_mut().find(|p| p.id == Some(id)) {
                    *stored = project.clone();
                } else {
                    self.projects.push(project.clone());
                }
            }
            None => {
                self.next_id += 1;
                project.id = Some(self.next_id);
                self.projects.push(project.clone());
            }
        }
    }

    fn save_all(&mut self, projects: &mut [Project]) {
        for project in projects {
            self.save(project);
        }
    }

    fn delete_all(&mut self, ids: &[ProjectRecordId]) {
        self.projects
            .retain(|p| p.id.map_or(true, |id| !ids.contains(&id)));
    }
}

#[derive(Debug, Default)]
pub struct MemorySnapshotRepository {
    snapshots: Vec<CodeQualitySnapshot>,
}

impl SnapshotRepository for MemorySnapshotRepository {
    fn find_by_project_and_timestamp(
        &self,
        project_record_id: ProjectRecordId,
        timestamp: i64,
    ) -> Option<CodeQualitySnapshot> {
        self.snapshots
            .iter()
            .find(|s| s.project_record_id == Some(project_record_id) && s.timestamp == timestamp)
            .cloned()
    }

    fn save(&mut self, snapshot: CodeQualitySnapshot) {
        self.snapshots.push(snapshot);
    }

    fn count(&self) -> usize {
        self.snapshots.len()
    }
}

#[derive(Debug, Default)]
pub struct MemoryProfileRepository {
    changes: Vec<ProfileConfigChange>,
}

impl MemoryProfileRepository {
    pub fn all(&self) -> &[ProfileConfigChange] {
        &self.changes
    }
}

impl ProfileRepository for MemoryProfileRepository {
    fn exists(
        &self,
        collector_id: CollectorId,
        user_login: Option<&str>,
        operation: Operation,
        timestamp: i64,
    ) -> bool {
        self.changes.iter().any(|c| {
            c.collector_id == collector_id
                && c.user_login.as_deref() == user_login
                && c.operation == operation
                && c.timestamp == timestamp
        })
    }

    fn save_all(&mut self, changes: Vec<ProfileConfigChange>) {
        self.changes.extend(changes);
    }
}

#[derive(Debug, Default)]
pub struct MemoryCollectorRepository {
    collectors: Vec<Collector>,
    next_id: CollectorId,
}

impl CollectorRepository for MemoryCollectorRepository {
    fn find_by_name(&self, name: &str) -> Option<Collector> {
        self.collectors.iter().find(|c| c.name == name).cloned()
    }

    fn save(&mut self, collector: &mut Collector) {
        match collector.id {
            Some(id) => {
                if let Some(stored) = self.collectors.iter_mut().find(|c| c.id == Some(id)) {
                    *stored = collector.clone();
                } else {
                    self.collectors.push(collector.clone());
                }
            }
            None => {
                self.next_id += 1;
                collector.id = Some(self.next_id);
                self.collectors.push(collector.clone());
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryComponentRepository {
    referenced: HashSet<ProjectRecordId>,
}

impl MemoryComponentRepository {
    /// Marks a stored project as referenced by a dashboard component.
    pub fn link(&mut self, project_record_id: ProjectRecordId) {
        self.referenced.insert(project_record_id);
    }
}

impl ComponentRepository for MemoryComponentRepository {
    fn referenced_project_ids(&self, _collector_id: CollectorId) -> HashSet<ProjectRecordId> {
        self.referenced.clone()
    }

    fn unlink(&mut self, project_record_id: ProjectRecordId) {
        self.referenced.remove(&project_record_id);
    }
}

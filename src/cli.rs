use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use crate::collector::{refresh, CollectorTask, RefreshStores};
use crate::models::{Collector, RunSummary};
use crate::repository::{
    CollectorRepository, MemoryCollectorRepository, MemoryComponentRepository,
    MemoryProfileRepository, MemoryProjectRepository, MemorySnapshotRepository,
    SnapshotRepository,
};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "qualens")]
#[command(author, version, about = "Code Quality Collection Tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file path
    #[arg(short, long, global = true, default_value = "qualens.json")]
    config: PathBuf,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect quality data from every configured server
    Collect,

    /// Refresh quality data for one project on demand
    Refresh {
        /// Server instance URL the project lives on
        #[arg(short, long)]
        instance_url: String,

        /// Project name, as stored from a previous collection
        #[arg(short = 'n', long)]
        project_name: Option<String>,

        /// Upstream project key, for projects not yet stored
        #[arg(short = 'k', long)]
        project_key: Option<String>,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let settings = Settings::load(&self.config)?;

        match &self.command {
            Commands::Collect => {
                info!("Collecting quality data from {} servers", settings.servers.len());

                let mut projects = MemoryProjectRepository::default();
                let mut snapshots = MemorySnapshotRepository::default();
                let mut profiles = MemoryProfileRepository::default();
                let mut components = MemoryComponentRepository::default();
                let mut collectors = MemoryCollectorRepository::default();

                let mut collector = Collector::prototype(
                    settings.servers.clone(),
                    settings.nice_names.clone(),
                );
                collectors.save(&mut collector);

                let mut task = CollectorTask::new(
                    &settings,
                    &mut projects,
                    &mut snapshots,
                    &mut profiles,
                    &mut components,
                    &mut collectors,
                );
                task.collect(&mut collector).await;

                let summary = RunSummary {
                    collector: collector.name.clone(),
                    collected_at: Utc::now(),
                    servers: collector.servers.clone(),
                    projects_discovered: projects.all().len(),
                    enabled_projects: projects.all().iter().filter(|p| p.enabled).count(),
                    snapshots_persisted: snapshots.count(),
                    elapsed_seconds: collector.last_executed_seconds,
                };
                self.write_json(&summary)?;

                Ok(())
            }
            Commands::Refresh {
                instance_url,
                project_name,
                project_key,
            } => {
                let mut projects = MemoryProjectRepository::default();
                let mut snapshots = MemorySnapshotRepository::default();
                let mut collectors = MemoryCollectorRepository::default();

                let mut collector = Collector::prototype(
                    settings.servers.clone(),
                    settings.nice_names.clone(),
                );
                collectors.save(&mut collector);

                let mut stores = RefreshStores {
                    projects: &mut projects,
                    snapshots: &mut snapshots,
                    collectors: &collectors,
                };
                let status = refresh(
                    &settings,
                    &mut stores,
                    Some(instance_url),
                    project_name.as_deref(),
                    project_key.as_deref(),
                )
                .await;
                println!("{status}");

                Ok(())
            }
        }
    }

    fn write_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Summary written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }
}

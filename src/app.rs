//! Application state
//!
//! Holds the active project and the cache-aware [`ResourceService`], and
//! executes parsed [`Command`]s into printable rows.

use crate::command::{Command, HELP};
use crate::enrich::{Detail, UNKNOWN_STATUS};
use crate::gcp::auth::validate_project_id;
use crate::gcp::format_gcp_error;
use crate::resource::{
    extract_json_value, get_all_resource_keys, get_resource, DetailedRecord, ResourceApi,
    ResourceDef, ResourceService,
};
use anyhow::Result;
use serde_json::Value;

/// Result of executing one command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Lines to print
    Output(Vec<String>),
    Quit,
}

pub struct App<A> {
    pub service: ResourceService<A>,
    pub project: String,
}

impl<A: ResourceApi> App<A> {
    pub fn new(service: ResourceService<A>, project: &str) -> Self {
        Self {
            service,
            project: project.to_string(),
        }
    }

    pub fn zone(&self) -> &str {
        self.service.api().location()
    }

    /// Execute a command. Failures are rendered as a single `Error:` line.
    pub async fn execute(&mut self, command: Command) -> Outcome {
        match self.dispatch(command).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Command failed: {:#}", e);
                Outcome::Output(vec![format!("Error: {}", format_gcp_error(&e))])
            }
        }
    }

    async fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        let lines = match command {
            Command::Quit => return Ok(Outcome::Quit),
            Command::Help => HELP.lines().map(str::to_string).collect(),
            Command::Classes => get_all_resource_keys()
                .into_iter()
                .filter_map(|key| get_resource(key).map(|def| format!("{}\t{}", key, def.display_name)))
                .collect(),
            Command::List { class, sub_ids } => {
                let items = self.service.list(&self.project, &class, &sub_ids).await?;
                let def = resource_def(&class)?;
                render_list(def, &items)
            }
            Command::Describe { class, sub_ids } => {
                let records = self
                    .service
                    .list_detailed(&self.project, &class, &sub_ids)
                    .await?;
                let def = resource_def(&class)?;
                render_detailed(def, &records)
            }
            Command::Refresh { class: Some(class) } => {
                resource_def(&class)?;
                let dropped = self.service.invalidate_class(&self.project, &class);
                vec![format!("Dropped {} cached {} entries", dropped, class)]
            }
            Command::Refresh { class: None } => {
                let dropped = self.service.invalidate_scope(&self.project);
                vec![format!("Dropped {} cached entries for {}", dropped, self.project)]
            }
            Command::Project(project) => {
                if !validate_project_id(&project) {
                    anyhow::bail!("Invalid project ID: {}", project);
                }
                tracing::info!("Switching project to {}", project);
                self.project = project;
                vec![format!("Project: {}", self.project)]
            }
            Command::Zone(zone) => {
                tracing::info!("Switching zone to {}", zone);
                self.service.api_mut().switch_location(&zone);
                vec![format!("Zone: {}", zone)]
            }
            Command::Age { class, sub_ids } => {
                resource_def(&class)?;
                match self.service.age(&self.project, &class, &sub_ids) {
                    Some(age) => vec![format!("{} cached {}s ago", class, age.as_secs())],
                    None => vec![format!("{} not cached", class)],
                }
            }
            Command::Stats => {
                let stats = self.service.stats();
                vec![
                    format!("hits\t{}", stats.hits),
                    format!("misses\t{}", stats.misses),
                    format!("hit rate\t{:.1}%", stats.hit_rate()),
                    format!("detail hits\t{}", stats.detail_hits),
                    format!("detail misses\t{}", stats.detail_misses),
                    format!("list entries\t{}", stats.list_entries),
                    format!("detail entries\t{}", stats.detail_entries),
                ]
            }
        };
        Ok(Outcome::Output(lines))
    }
}

fn resource_def(class: &str) -> Result<&'static ResourceDef> {
    get_resource(class).ok_or_else(|| anyhow::anyhow!("Unknown resource: {}", class))
}

/// Summary columns of one record: id, name, status, timestamp
fn summary_columns(def: &ResourceDef, item: &Value) -> Vec<String> {
    let mut columns = vec![extract_json_value(item, &def.id_field)];
    if def.name_field != def.id_field {
        columns.push(extract_json_value(item, &def.name_field));
    }
    for field in [&def.status_field, &def.timestamp_field].into_iter().flatten() {
        columns.push(extract_json_value(item, field));
    }
    columns
}

fn render_list(def: &ResourceDef, items: &[Value]) -> Vec<String> {
    if items.is_empty() {
        return vec![format!("No {} found", def.display_name)];
    }
    items
        .iter()
        .map(|item| summary_columns(def, item).join("\t"))
        .collect()
}

fn render_detailed(def: &ResourceDef, records: &[DetailedRecord]) -> Vec<String> {
    if records.is_empty() {
        return vec![format!("No {} found", def.display_name)];
    }
    records
        .iter()
        .map(|record| {
            let mut columns = summary_columns(def, &record.summary);
            columns.push(match &record.detail {
                Detail::Fetched(detail) => summarize_detail(detail),
                Detail::Unavailable(reason) => format!("{} ({})", UNKNOWN_STATUS, reason),
            });
            columns.join("\t")
        })
        .collect()
}

/// One-cell summary of a detail record: its largest list, or its size
fn summarize_detail(detail: &Value) -> String {
    let Some(obj) = detail.as_object() else {
        return detail.to_string();
    };
    obj.iter()
        .filter_map(|(name, value)| value.as_array().map(|arr| (name, arr.len())))
        .max_by_key(|(_, len)| *len)
        .map(|(name, len)| format!("{} {}", len, name))
        .unwrap_or_else(|| format!("{} fields", obj.len()))
}

//! Pacemaker (`pcs`) backend.
//!
//! Script layout:
//! 1. snapshot of live cluster state (resources, constraints, locations)
//! 2. shadow CIB creation
//! 3. per resource: create + replication setup for its mode
//! 4. location, order and colocation constraints
//! 5. verify and push the shadow CIB
//!
//! Timeouts handed to pacemaker are twice the declared values.

use super::commands::{PcsCommand, CONSTRAINTS_VAR, LOCATION_VAR, RESOURCES_VAR};
use super::{Backend, Provenance};
use crate::core::script::Script;
use crate::core::types::{HaMode, ResourceGraph, ResourceSpec, Seconds};
use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

const TIMEOUT_FACTOR: u64 = 2;
const DEFAULT_CIB: &str = "cluster.xml";

/// Name a constraint must use for a resource in `mode`.
pub fn constraint_id(resource: &str, mode: HaMode) -> String {
    match mode {
        HaMode::ActivePassive => resource.to_string(),
        HaMode::ActiveActive => format!("{}-clone", resource),
        HaMode::MasterSlave => master_id(resource),
    }
}

fn master_id(resource: &str) -> String {
    format!("{}_Master", resource)
}

/// Shadow CIB file named after the output script: `ha.sh` → `ha.xml`.
pub fn cib_file_for(output: &Path) -> String {
    let name = output
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let stem = name.strip_suffix(".sh").unwrap_or(name);
    if stem.is_empty() {
        DEFAULT_CIB.to_string()
    } else {
        format!("{}.xml", stem)
    }
}

/// Pacemaker script generator.
#[derive(Debug, Clone)]
pub struct PcsBackend {
    cib: String,
    provenance: Option<Provenance>,
}

impl Default for PcsBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CIB)
    }
}

impl PcsBackend {
    pub fn new(cib: impl Into<String>) -> Self {
        Self {
            cib: cib.into(),
            provenance: None,
        }
    }

    /// Backend whose shadow CIB is named after `output`.
    pub fn for_output(output: &Path) -> Self {
        Self::new(cib_file_for(output))
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    pub fn cib(&self) -> &str {
        &self.cib
    }

    /// Creation and replication commands, one group per resource.
    pub fn resource_commands(&self, graph: &ResourceGraph) -> std::result::Result<Vec<PcsCommand>, String> {
        let mut cmds = Vec::new();
        for (id, resource) in &graph.resources {
            cmds.push(create_command(id, resource)?);
            if let Some(replica) = replication_command(id, resource)? {
                cmds.push(replica);
            }
        }
        Ok(cmds)
    }

    /// One location command per (resource, node, score).
    pub fn location_commands(&self, graph: &ResourceGraph) -> std::result::Result<Vec<PcsCommand>, String> {
        let mut cmds = Vec::new();
        for (id, resource) in &graph.resources {
            let target = constraint_id(id, resource.ha.mode);
            for (node, score) in &resource.ha.location {
                let score = score
                    .value()
                    .map_err(|e| format!("resource '{}' location '{}': {}", id, node, e))?;
                cmds.push(PcsCommand::Location {
                    resource: target.clone(),
                    node: node.clone(),
                    score,
                });
            }
        }
        Ok(cmds)
    }

    /// One order command per predecessor edge.
    pub fn order_commands(&self, graph: &ResourceGraph) -> std::result::Result<Vec<PcsCommand>, String> {
        graph
            .predecessor_edges
            .iter()
            .map(|edge| {
                Ok(PcsCommand::Order {
                    first: edge_end(graph, &edge.0)?,
                    then: edge_end(graph, &edge.1)?,
                })
            })
            .collect()
    }

    /// One colocation command per colocation edge.
    pub fn colocation_commands(&self, graph: &ResourceGraph) -> std::result::Result<Vec<PcsCommand>, String> {
        graph
            .colocation_edges
            .iter()
            .map(|edge| {
                Ok(PcsCommand::Colocation {
                    first: edge_end(graph, &edge.0)?,
                    second: edge_end(graph, &edge.1)?,
                })
            })
            .collect()
    }

    /// Every command in emission order.
    pub fn commands(&self, graph: &ResourceGraph) -> std::result::Result<Vec<PcsCommand>, String> {
        let mut cmds = self.resource_commands(graph)?;
        cmds.extend(self.location_commands(graph)?);
        cmds.extend(self.order_commands(graph)?);
        cmds.extend(self.colocation_commands(graph)?);
        Ok(cmds)
    }

    fn render_all(&self, cmds: &[PcsCommand]) -> Vec<String> {
        cmds.iter().map(|c| c.render(&self.cib)).collect()
    }

    fn build(&self, graph: &ResourceGraph) -> std::result::Result<Script, String> {
        let resources = self.resource_commands(graph)?;
        let locations = self.location_commands(graph)?;
        let orders = self.order_commands(graph)?;
        let colocations = self.colocation_commands(graph)?;

        let mut script = Script::new();
        script.push("#!/bin/bash");
        script.blank();
        if let Some(ref p) = self.provenance {
            script.extend(p.header_lines(self.name()));
            script.blank();
        }

        script.comment("Assign variable");
        script.push(format!("{}=$(pcs resource)", RESOURCES_VAR));
        script.push(format!("{}=$(pcs constraint)", CONSTRAINTS_VAR));
        script.push(format!("{}=$(pcs constraint location)", LOCATION_VAR));
        script.blank();

        script.comment("Set pcs cluster");
        script.push(format!("pcs cluster cib {}", super::commands::shell_value(&self.cib)));
        script.blank();

        script.comment("Create Resource");
        script.extend(self.render_all(&resources));
        for (title, cmds) in [
            ("Location", &locations),
            ("Order", &orders),
            ("Colocation", &colocations),
        ] {
            script.blank();
            script.comment(title);
            script.extend(self.render_all(cmds));
        }

        script.blank();
        script.comment("Verify and commit");
        let cib = super::commands::shell_value(&self.cib);
        script.push(format!("pcs cluster verify -V {}", cib));
        script.push(format!("pcs cluster cib-push {}", cib));

        debug!(
            resources = graph.resources.len(),
            locations = locations.len(),
            orders = orders.len(),
            colocations = colocations.len(),
            "rendered pcs script"
        );
        Ok(script)
    }
}

impl Backend for PcsBackend {
    fn name(&self) -> &'static str {
        "pcs"
    }

    fn generate(&self, graph: &ResourceGraph) -> Result<Script> {
        self.build(graph)
            .map_err(|msg| Error::generation(self.name(), msg))
    }
}

fn doubled(resource: &str, label: &str, value: &Seconds) -> std::result::Result<u64, String> {
    let secs = value
        .seconds()
        .map_err(|e| format!("resource '{}' {} timeout: {}", resource, label, e))?;
    secs.checked_mul(TIMEOUT_FACTOR)
        .ok_or_else(|| format!("resource '{}' {} timeout overflows", resource, label))
}

fn create_command(id: &str, resource: &ResourceSpec) -> std::result::Result<PcsCommand, String> {
    let provider = &resource.provider;
    Ok(PcsCommand::Create {
        resource: id.to_string(),
        agent: provider.name.clone(),
        params: pairs(&resource.parameters),
        meta: pairs(&resource.metadata),
        start_timeout: doubled(id, "start", provider.start_timeout())?,
        monitor_timeout: doubled(id, "monitor", provider.monitor_timeout())?,
        stop_timeout: doubled(id, "stop", provider.stop_timeout())?,
        monitor_interval: interval(id, &provider.interval)?,
    })
}

/// Monitor interval as written, once it is known to be a duration.
fn interval(resource: &str, value: &Seconds) -> std::result::Result<String, String> {
    value
        .seconds()
        .map_err(|e| format!("resource '{}' monitor interval: {}", resource, e))?;
    Ok(value.as_str().trim().to_string())
}

fn replication_command(
    id: &str,
    resource: &ResourceSpec,
) -> std::result::Result<Option<PcsCommand>, String> {
    let clones = resource.ha.clones.as_ref();
    let params = clones.map(|c| pairs(&c.parameters)).unwrap_or_default();
    let active = || {
        clones
            .and_then(|c| c.active)
            .ok_or_else(|| format!("resource '{}' ({}) has no clones.active", id, resource.ha.mode))
    };

    match resource.ha.mode {
        HaMode::ActivePassive => Ok(None),
        HaMode::ActiveActive => {
            let active = active()?;
            Ok(Some(PcsCommand::Clone {
                resource: id.to_string(),
                clone_max: active.max,
                clone_node_max: active.node_max,
                params,
            }))
        }
        HaMode::MasterSlave => {
            let active = active()?;
            let master = clones
                .and_then(|c| c.master)
                .ok_or_else(|| format!("resource '{}' (master_slave) has no clones.master", id))?;
            Ok(Some(PcsCommand::Master {
                master: master_id(id),
                resource: id.to_string(),
                clone_max: active.max,
                clone_node_max: active.node_max,
                master_max: master.max,
                master_node_max: master.node_max,
                params,
            }))
        }
    }
}

fn edge_end(graph: &ResourceGraph, name: &str) -> std::result::Result<String, String> {
    graph
        .resources
        .get(name)
        .map(|r| constraint_id(name, r.ha.mode))
        .ok_or_else(|| format!("edge references unknown resource '{}'", name))
}

fn pairs(map: &indexmap::IndexMap<String, String>) -> Vec<(String, String)> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

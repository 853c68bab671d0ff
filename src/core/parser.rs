//! Spec loading and validation.
//!
//! Parses a compiled resource graph (JSON, or YAML by extension) and checks
//! structural constraints:
//! - Edge endpoints and isolated names must be declared resources
//! - Dependency names must be declared resources
//! - Clone limits must match the replication mode
//! - Resource names and parameter/metadata keys must be shell-safe words

use super::types::*;
use super::vars::{self, ProvisionVars};
use crate::error::{Error, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.:-]*$").expect("static regex")
});

static KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.:-]+$").expect("static regex"));

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Document syntax of a compiled spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    /// `.yaml` / `.yml` select YAML; everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// A loaded spec together with its variable source.
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub graph: ResourceGraph,
    pub vars: ProvisionVars,
}

/// Load and validate a compiled spec and its variable source.
pub fn load(spec_path: &Path, vars_path: &Path) -> Result<LoadedSpec> {
    ensure_file(spec_path)?;
    ensure_file(vars_path)?;
    let graph = load_graph(spec_path)?;
    let vars = vars::load_vars(vars_path)?;
    Ok(LoadedSpec { graph, vars })
}

/// Load and validate a compiled spec from disk.
pub fn load_graph(path: &Path) -> Result<ResourceGraph> {
    ensure_file(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| Error::InvalidInput {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let graph = parse_graph(&content, SpecFormat::from_path(path))?;
    check_graph(&graph)?;
    debug!(
        path = %path.display(),
        resources = graph.resources.len(),
        orders = graph.predecessor_edges.len(),
        colocations = graph.colocation_edges.len(),
        "loaded resource graph"
    );
    Ok(graph)
}

/// Parse a compiled spec from text without validating it.
pub fn parse_graph(text: &str, format: SpecFormat) -> Result<ResourceGraph> {
    match format {
        SpecFormat::Json => {
            serde_json::from_str(text).map_err(|e| Error::malformed(format!("JSON parse error: {}", e)))
        }
        SpecFormat::Yaml => serde_yaml_ng::from_str(text)
            .map_err(|e| Error::malformed(format!("YAML parse error: {}", e))),
    }
}

/// Validate and collapse all findings into one error.
pub fn check_graph(graph: &ResourceGraph) -> Result<()> {
    let errors = validate_graph(graph);
    if errors.is_empty() {
        return Ok(());
    }
    let joined = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    Err(Error::malformed(joined))
}

/// Validate a parsed graph. Returns a list of errors (empty = valid).
pub fn validate_graph(graph: &ResourceGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let known = |name: &str| graph.resources.contains_key(name);

    for (kind, edges) in [
        ("order", &graph.predecessor_edges),
        ("colocation", &graph.colocation_edges),
    ] {
        for edge in edges {
            for end in [&edge.0, &edge.1] {
                if !known(end.as_str()) {
                    errors.push(ValidationError {
                        message: format!("{} edge {} references unknown resource '{}'", kind, edge, end),
                    });
                }
            }
        }
    }

    for name in &graph.isolated_resources {
        if !known(name.as_str()) {
            errors.push(ValidationError {
                message: format!("isolated resource '{}' is not declared", name),
            });
        }
    }

    for (id, resource) in &graph.resources {
        if !NAME_RE.is_match(id) {
            errors.push(ValidationError {
                message: format!("resource name '{}' contains unsupported characters", id),
            });
        }

        for (kind, deps) in [
            ("predecessor", &resource.dependencies.predecessors),
            ("colocation", &resource.dependencies.colocation),
        ] {
            for dep in deps {
                if !known(dep.as_str()) {
                    errors.push(ValidationError {
                        message: format!("resource '{}' has unknown {} '{}'", id, kind, dep),
                    });
                }
                if dep == id {
                    errors.push(ValidationError {
                        message: format!("resource '{}' lists itself as {}", id, kind),
                    });
                }
            }
        }

        let clone_params = resource.ha.clones.as_ref().map(|c| &c.parameters);
        for (section, map) in [
            ("parameters", Some(&resource.parameters)),
            ("metadata", Some(&resource.metadata)),
            ("clones.parameters", clone_params),
        ] {
            for key in map.into_iter().flat_map(|m| m.keys()) {
                if !KEY_RE.is_match(key) {
                    errors.push(ValidationError {
                        message: format!(
                            "resource '{}' {} key '{}' contains unsupported characters",
                            id, section, key
                        ),
                    });
                }
            }
        }

        let clones = resource.ha.clones.as_ref();
        let active = clones.and_then(|c| c.active);
        let master = clones.and_then(|c| c.master);
        match resource.ha.mode {
            HaMode::ActivePassive => {
                if master.is_some() {
                    errors.push(ValidationError {
                        message: format!("resource '{}' (active_passive) sets clones.master", id),
                    });
                }
            }
            HaMode::ActiveActive => {
                if active.is_none() {
                    errors.push(ValidationError {
                        message: format!("resource '{}' (active_active) has no clones.active", id),
                    });
                }
                if master.is_some() {
                    errors.push(ValidationError {
                        message: format!("resource '{}' (active_active) sets clones.master", id),
                    });
                }
            }
            HaMode::MasterSlave => {
                if active.is_none() {
                    errors.push(ValidationError {
                        message: format!("resource '{}' (master_slave) has no clones.active", id),
                    });
                }
                if master.is_none() {
                    errors.push(ValidationError {
                        message: format!("resource '{}' (master_slave) has no clones.master", id),
                    });
                }
            }
        }
    }

    errors
}

fn ensure_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::InvalidInput {
            path: path.to_path_buf(),
            reason: "not an existing file".to_string(),
        })
    }
}

//! Placeholder resolution.
//!
//! Replaces `${namespace.key}` tokens in the graph's string fields with
//! deployment values. Each field is scanned once, left to right; substituted
//! text is never rescanned, so values containing `${...}` are not expanded.

use super::types::*;
use super::vars::VariableSource;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{[^}]*\}").expect("static regex"));

/// What to do with a token the variable source has no value for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingVars {
    /// Keep the literal `${...}` text and log a warning
    #[default]
    Keep,
    /// Fail with a variable resolution error
    Fail,
}

/// Look up a token key: verbatim first, then with `_` read as `.` when the
/// key has no namespace separator (`${cluster_id}` → `cluster.id`).
pub fn lookup_key(source: &dyn VariableSource, key: &str) -> Option<String> {
    source.lookup(key).or_else(|| {
        if !key.contains('.') && key.contains('_') {
            source.lookup(&key.replace('_', "."))
        } else {
            None
        }
    })
}

/// Stateful resolver; counts substitutions for the run summary.
pub struct Resolver<'a> {
    source: &'a dyn VariableSource,
    policy: MissingVars,
    substituted: usize,
    kept: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(source: &'a dyn VariableSource, policy: MissingVars) -> Self {
        Self {
            source,
            policy,
            substituted: 0,
            kept: 0,
        }
    }

    /// Resolve all tokens in one string.
    pub fn resolve_str(&mut self, template: &str) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("${") {
            out.push_str(&rest[..open]);
            let body = &rest[open + 2..];
            let close = body.find('}').ok_or_else(|| {
                Error::variable(format!("unclosed '${{' in \"{}\"", template))
            })?;
            let key = body[..close].trim();
            if key.is_empty() || key.contains("${") {
                return Err(Error::variable(format!(
                    "malformed placeholder in \"{}\"",
                    template
                )));
            }
            let token = &rest[open..open + close + 3];

            match lookup_key(self.source, key) {
                Some(value) => {
                    self.substituted += 1;
                    out.push_str(&value);
                }
                None => match self.policy {
                    MissingVars::Keep => {
                        warn!(token, "no value for placeholder; keeping literal text");
                        self.kept += 1;
                        out.push_str(token);
                    }
                    MissingVars::Fail => {
                        return Err(Error::variable(format!("no value for {}", token)));
                    }
                },
            }
            rest = &body[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    fn resolve_map(&mut self, map: &IndexMap<String, String>) -> Result<IndexMap<String, String>> {
        map.iter()
            .map(|(k, v)| Ok((k.clone(), self.resolve_str(v)?)))
            .collect()
    }

    fn resolve_seconds(&mut self, s: &Seconds) -> Result<Seconds> {
        Ok(Seconds::new(self.resolve_str(s.as_str())?))
    }

    /// Resolve every templatable field of a resource.
    ///
    /// Parameter, metadata and clone-parameter keys are literal; the loader
    /// restricts them to bare words, so they never carry placeholders.
    pub fn resolve_resource(&mut self, id: &str, resource: &ResourceSpec) -> Result<ResourceSpec> {
        let mut r = resource.clone();

        r.provider.name = self.resolve_str(&resource.provider.name)?;
        r.provider.timeouts = [
            self.resolve_seconds(resource.provider.start_timeout())?,
            self.resolve_seconds(resource.provider.monitor_timeout())?,
            self.resolve_seconds(resource.provider.stop_timeout())?,
        ];
        r.provider.interval = self.resolve_seconds(&resource.provider.interval)?;
        r.parameters = self.resolve_map(&resource.parameters)?;
        r.metadata = self.resolve_map(&resource.metadata)?;

        if let Some(ref clones) = resource.ha.clones {
            let mut c = clones.clone();
            c.parameters = self.resolve_map(&clones.parameters)?;
            r.ha.clones = Some(c);
        }

        let mut location = IndexMap::with_capacity(resource.ha.location.len());
        for (node, score) in &resource.ha.location {
            let node = self.resolve_str(node)?;
            let score = Score::new(self.resolve_str(score.as_str())?);
            if location.insert(node.clone(), score).is_some() {
                return Err(Error::variable(format!(
                    "resource '{}' has two location entries resolving to node '{}'",
                    id, node
                )));
            }
        }
        r.ha.location = location;

        Ok(r)
    }

    /// Resolve a whole graph into a new, concrete graph.
    pub fn resolve_graph(&mut self, graph: &ResourceGraph) -> Result<ResourceGraph> {
        let mut resolved = graph.clone();
        for (id, resource) in &graph.resources {
            resolved.resources[id.as_str()] = self.resolve_resource(id, resource)?;
        }
        debug!(
            substituted = self.substituted,
            kept = self.kept,
            "resolved placeholders"
        );
        Ok(resolved)
    }

    /// Tokens left as literal text so far.
    pub fn kept(&self) -> usize {
        self.kept
    }

    /// Tokens replaced so far.
    pub fn substituted(&self) -> usize {
        self.substituted
    }
}

/// Resolve a graph against a variable source.
pub fn resolve(
    graph: &ResourceGraph,
    source: &dyn VariableSource,
    policy: MissingVars,
) -> Result<ResourceGraph> {
    Resolver::new(source, policy).resolve_graph(graph)
}

/// Placeholder tokens still present anywhere in the graph, deduplicated.
pub fn unresolved_tokens(graph: &ResourceGraph) -> Vec<String> {
    let text = match serde_json::to_string(graph) {
        Ok(t) => t,
        Err(_) => return Vec::new(),
    };
    let mut tokens: Vec<String> = TOKEN_RE
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

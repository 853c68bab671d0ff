//! Deployment-variable source: dotted-path lookup over a YAML document.
//!
//! The resolver only needs `lookup(key)`; anything implementing
//! [`VariableSource`] can be injected in place of the file-backed store.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Key/value lookup used by the variable resolver.
pub trait VariableSource {
    /// Value for a dotted key such as `cluster.node1.hostname`.
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Provisioning values loaded from a YAML document.
#[derive(Debug, Clone, Default)]
pub struct ProvisionVars {
    root: serde_yaml_ng::Value,
}

impl ProvisionVars {
    pub fn new(root: serde_yaml_ng::Value) -> Self {
        Self { root }
    }

    /// Parse provisioning values from YAML text.
    pub fn parse(yaml: &str) -> std::result::Result<Self, String> {
        let root: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))?;
        Ok(Self::new(root))
    }

    /// Dotted-path lookup with a default, mirroring the provisioning store API.
    pub fn get(&self, key: &str, default: &str) -> String {
        self.lookup(key).unwrap_or_else(|| default.to_string())
    }

    fn walk(&self, key: &str) -> Option<&serde_yaml_ng::Value> {
        let mut node = &self.root;
        for part in key.split('.') {
            node = match node {
                serde_yaml_ng::Value::Mapping(m) => m.get(part)?,
                serde_yaml_ng::Value::Sequence(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }
}

impl VariableSource for ProvisionVars {
    fn lookup(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        match self.walk(key)? {
            serde_yaml_ng::Value::Mapping(_) | serde_yaml_ng::Value::Sequence(_) => None,
            leaf => Some(yaml_value_to_string(leaf)),
        }
    }
}

impl VariableSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Load provisioning values from a file.
pub fn load_vars(path: &Path) -> Result<ProvisionVars> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::InvalidInput {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    ProvisionVars::parse(&content).map_err(|reason| Error::InvalidInput {
        path: path.to_path_buf(),
        reason,
    })
}

/// Convert a scalar YAML value to the string substituted into the graph.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}

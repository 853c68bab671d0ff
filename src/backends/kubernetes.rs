//! Container-scheduler backend.
//!
//! Emits one pod deployment per resource in graph order. Ordering,
//! colocation, placement and replication mode are not expressed; a graph
//! that carries any of them still generates, with a warning per ignored
//! constraint kind.

use super::{Backend, Provenance};
use crate::core::script::Script;
use crate::core::types::{HaMode, ResourceGraph};
use crate::error::Result;
use tracing::warn;

/// `kubectl` script generator.
#[derive(Debug, Clone, Default)]
pub struct KubernetesBackend {
    provenance: Option<Provenance>,
}

impl KubernetesBackend {
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    fn warn_ignored(&self, graph: &ResourceGraph) {
        let replicated = graph
            .resources
            .values()
            .filter(|r| r.ha.mode != HaMode::ActivePassive)
            .count();
        let placed = graph
            .resources
            .values()
            .filter(|r| !r.ha.location.is_empty())
            .count();
        for (what, count) in [
            ("order edges", graph.predecessor_edges.len()),
            ("colocation edges", graph.colocation_edges.len()),
            ("location preferences", placed),
            ("replicated resources", replicated),
        ] {
            if count > 0 {
                warn!(count, "kubernetes backend ignores {}", what);
            }
        }
    }
}

impl Backend for KubernetesBackend {
    fn name(&self) -> &'static str {
        "kubernetes"
    }

    fn generate(&self, graph: &ResourceGraph) -> Result<Script> {
        self.warn_ignored(graph);

        let mut script = Script::new();
        script.push("#!/bin/bash");
        script.blank();
        if let Some(ref p) = self.provenance {
            script.extend(p.header_lines(self.name()));
            script.blank();
        }
        script.comment("Create Pod");
        script.extend(
            graph
                .resources
                .keys()
                .map(|id| format!("kubectl deploy pod {}.yaml", id)),
        );
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::{parse_graph, SpecFormat};

    const GRAPH: &str = r#"{
  "resources": {
    "db": {
      "provider": { "name": "ocf:eos:db", "timeouts": [1, 1, 1], "interval": 1 },
      "ha": { "mode": "active_active", "clones": { "active": [1, 2] }, "location": { "n1": 5 } }
    },
    "app": {
      "provider": { "name": "systemd:app", "timeouts": [1, 1, 1], "interval": 1 },
      "ha": { "mode": "active_passive" }
    }
  },
  "predecessors_edge": [["db", "app"]],
  "colocation_edges": [["db", "app"]]
}"#;

    #[test]
    fn test_kubernetes_one_deploy_per_resource() {
        let g = parse_graph(GRAPH, SpecFormat::Json).unwrap();
        let script = KubernetesBackend::default().generate(&g).unwrap();
        assert_eq!(
            script.render(),
            "#!/bin/bash\n\n# Create Pod\nkubectl deploy pod db.yaml\nkubectl deploy pod app.yaml\n"
        );
    }

    #[test]
    fn test_kubernetes_ignores_constraints() {
        let g = parse_graph(GRAPH, SpecFormat::Json).unwrap();
        let script = KubernetesBackend::default().generate(&g).unwrap();
        assert_eq!(script.commands().count(), 2);
        assert!(script.commands().all(|l| l.starts_with("kubectl deploy pod ")));
    }

    #[test]
    fn test_kubernetes_empty_graph() {
        let g = parse_graph(r#"{ "resources": {} }"#, SpecFormat::Json).unwrap();
        let script = KubernetesBackend::default().generate(&g).unwrap();
        assert_eq!(script.commands().count(), 0);
    }
}

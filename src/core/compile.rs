//! Compilation pipeline: load → resolve → reduce → generate → write.
//!
//! Every stage runs to completion before the output path is touched, so a
//! failed compilation never leaves a script behind.

use super::parser::{self, ValidationError};
use super::reducer::{self, ClosurePolicy};
use super::resolver::{self, MissingVars, Resolver};
use super::script::Script;
use super::{order, types::ResourceGraph};
use crate::backends::{BackendKind, Provenance};
use crate::error::Result;
use indexmap::IndexSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything one compilation run needs.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Compiled resource graph (JSON, or YAML by extension)
    pub spec: PathBuf,
    /// Script to write
    pub output: PathBuf,
    /// Deployment variables (YAML)
    pub vars: PathBuf,
    pub backend: BackendKind,
    /// Restrict output to the closure of these resources
    pub subset: Option<IndexSet<String>>,
    pub missing_vars: MissingVars,
    pub closure: ClosurePolicy,
}

impl CompileOptions {
    pub fn new(spec: impl Into<PathBuf>, output: impl Into<PathBuf>, vars: impl Into<PathBuf>) -> Self {
        Self {
            spec: spec.into(),
            output: output.into(),
            vars: vars.into(),
            backend: BackendKind::default(),
            subset: None,
            missing_vars: MissingVars::default(),
            closure: ClosurePolicy::default(),
        }
    }
}

/// Run the full pipeline and write the script. Returns what was written.
pub fn compile(opts: &CompileOptions) -> Result<Script> {
    let script = render(opts)?;
    script.write_atomic(&opts.output)?;
    info!(
        output = %opts.output.display(),
        backend = %opts.backend,
        lines = script.lines().len(),
        "wrote script"
    );
    Ok(script)
}

/// Run the pipeline up to generation without writing anything.
pub fn render(opts: &CompileOptions) -> Result<Script> {
    let loaded = parser::load(&opts.spec, &opts.vars)?;

    let mut resolver = Resolver::new(&loaded.vars, opts.missing_vars);
    let concrete = resolver.resolve_graph(&loaded.graph)?;
    info!(
        substituted = resolver.substituted(),
        kept = resolver.kept(),
        "variables resolved"
    );

    let reduced = reducer::reduce(&concrete, opts.subset.as_ref(), opts.closure)?;

    let provenance = Provenance::from_files(&opts.spec, &opts.vars)?;
    let backend = opts.backend.build(&opts.output, Some(provenance));
    debug!(backend = backend.name(), "generating script");
    backend.generate(&reduced)
}

/// Outcome of checking a spec without generating anything.
#[derive(Debug, Clone)]
pub struct Report {
    pub graph: ResourceGraph,
    /// Placeholders with no value in the variable source
    pub unresolved: Vec<String>,
    /// Non-fatal findings
    pub warnings: Vec<ValidationError>,
}

/// Load and resolve a spec, collecting warnings instead of failing on them.
pub fn check(spec: &Path, vars: &Path, missing_vars: MissingVars) -> Result<Report> {
    let loaded = parser::load(spec, vars)?;
    let graph = resolver::resolve(&loaded.graph, &loaded.vars, missing_vars)?;
    let unresolved = resolver::unresolved_tokens(&graph);

    let mut warnings = Vec::new();
    if let Err(e) = order::start_order(&graph) {
        warnings.push(ValidationError {
            message: e.to_string(),
        });
    }
    for token in &unresolved {
        warnings.push(ValidationError {
            message: format!("no value for {}", token),
        });
    }
    for w in &warnings {
        warn!("{}", w);
    }

    Ok(Report {
        graph,
        unresolved,
        warnings,
    })
}

/// Closure of `subset` in the graph stored at `spec`.
pub fn closure_of(spec: &Path, subset: &IndexSet<String>, policy: ClosurePolicy) -> Result<IndexSet<String>> {
    let graph = parser::load_graph(spec)?;
    reducer::closure(&graph, subset, policy)
}

/// Start order of the graph stored at `spec`.
pub fn start_order_of(spec: &Path) -> Result<Vec<String>> {
    let graph = parser::load_graph(spec)?;
    order::start_order(&graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    const SPEC: &str = r#"{
  "resources": {
    "svc1": {
      "provider": { "name": "systemd:svc1", "timeouts": [10, 5, 8], "interval": 10 },
      "ha": { "mode": "active_passive" }
    },
    "svc2": {
      "provider": { "name": "systemd:svc2", "timeouts": [10, 5, 8], "interval": 10 },
      "parameters": { "nic": "${cluster.nic}" },
      "ha": { "mode": "active_active", "clones": { "active": [1, 3] } },
      "dependencies": { "predecessors": ["svc1"] }
    },
    "lone": {
      "provider": { "name": "systemd:lone", "timeouts": [1, 1, 1], "interval": 1 },
      "ha": { "mode": "active_passive" }
    }
  },
  "predecessors_edge": [["svc1", "svc2"]],
  "colocation_edges": [],
  "isolate_resources": ["lone"]
}"#;

    fn fixture(vars: &str) -> (TempDir, CompileOptions) {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("compiled.json");
        let vars_path = dir.path().join("vars.yaml");
        std::fs::write(&spec, SPEC).unwrap();
        std::fs::write(&vars_path, vars).unwrap();
        let out = dir.path().join("ha_rules.sh");
        let opts = CompileOptions::new(spec, out, vars_path);
        (dir, opts)
    }

    #[test]
    fn test_compile_writes_pcs_script() {
        let (dir, opts) = fixture("cluster:\n  nic: eth1\n");
        let script = compile(&opts).unwrap();
        let text = std::fs::read_to_string(dir.path().join("ha_rules.sh")).unwrap();
        assert_eq!(text, script.render());
        assert!(text.contains("pcs cluster cib ha_rules.xml"));
        assert!(text.contains("nic=eth1"));
        assert!(text.contains("constraint order svc1 then svc2-clone"));
        assert!(text.contains("resource create lone "));
    }

    #[test]
    fn test_compile_subset_prunes() {
        let (_dir, mut opts) = fixture("cluster:\n  nic: eth1\n");
        opts.subset = Some(reducer::parse_subset("svc2"));
        let script = compile(&opts).unwrap();
        let creates: Vec<_> = script
            .commands()
            .filter(|l| l.contains(" resource create "))
            .collect();
        assert_eq!(creates.len(), 2);
        assert!(creates.iter().all(|l| !l.contains(" resource create lone ")));
        assert!(script.commands().any(|l| l.contains(" resource clone svc2 ")));
    }

    #[test]
    fn test_compile_resolves_location_score() {
        let (dir, opts) = fixture("cluster:\n  nic: eth1\nprio:\n  n1: 100\n");
        let spec = SPEC.replace(
            r#""ha": { "mode": "active_passive" }
    },
    "svc2""#,
            r#""ha": { "mode": "active_passive", "location": { "srvnode-1": "${prio.n1}" } }
    },
    "svc2""#,
        );
        std::fs::write(dir.path().join("compiled.json"), spec).unwrap();
        let script = compile(&opts).unwrap();
        assert!(script
            .commands()
            .any(|l| l.ends_with("constraint location svc1 prefers srvnode-1=100")));
    }

    #[test]
    fn test_compile_unknown_subset_writes_nothing() {
        let (dir, mut opts) = fixture("cluster:\n  nic: eth1\n");
        opts.subset = Some(reducer::parse_subset("svc1 ghost"));
        let err = compile(&opts).unwrap_err();
        assert!(matches!(err, Error::UnknownResource(ref n) if n == "ghost"));
        assert!(!dir.path().join("ha_rules.sh").exists());
    }

    #[test]
    fn test_compile_missing_spec() {
        let (dir, mut opts) = fixture("{}\n");
        opts.spec = dir.path().join("absent.json");
        let err = compile(&opts).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
        assert!(!dir.path().join("ha_rules.sh").exists());
    }

    #[test]
    fn test_compile_strict_vars() {
        let (dir, mut opts) = fixture("cluster: {}\n");
        opts.missing_vars = MissingVars::Fail;
        let err = compile(&opts).unwrap_err();
        assert!(matches!(err, Error::VariableResolution(_)));
        assert!(!dir.path().join("ha_rules.sh").exists());
    }

    #[test]
    fn test_compile_keeps_missing_vars_by_default() {
        let (_dir, opts) = fixture("cluster: {}\n");
        let script = compile(&opts).unwrap();
        assert!(script.render().contains("nic=${cluster.nic}"));
    }

    #[test]
    fn test_compile_kubernetes() {
        let (_dir, mut opts) = fixture("cluster:\n  nic: eth1\n");
        opts.backend = BackendKind::Kubernetes;
        let script = compile(&opts).unwrap();
        let cmds: Vec<_> = script.commands().collect();
        assert_eq!(
            cmds,
            vec![
                "kubectl deploy pod svc1.yaml",
                "kubectl deploy pod svc2.yaml",
                "kubectl deploy pod lone.yaml"
            ]
        );
    }

    #[test]
    fn test_compile_provenance_header() {
        let (_dir, opts) = fixture("cluster:\n  nic: eth1\n");
        let script = render(&opts).unwrap();
        assert!(script.lines()[2].starts_with("# Generated by hagen"));
    }

    #[test]
    fn test_compile_check_reports_unresolved() {
        let (_dir, opts) = fixture("cluster: {}\n");
        let report = check(&opts.spec, &opts.vars, MissingVars::Keep).unwrap();
        assert_eq!(report.unresolved, vec!["${cluster.nic}"]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.graph.resources.len(), 3);
    }

    #[test]
    fn test_compile_closure_and_order() {
        let (_dir, opts) = fixture("{}\n");
        let members = closure_of(&opts.spec, &reducer::parse_subset("svc2"), ClosurePolicy::Undirected).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(start_order_of(&opts.spec).unwrap(), vec!["lone", "svc1", "svc2"]);
    }
}

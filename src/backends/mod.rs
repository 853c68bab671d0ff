//! Script backends.
//!
//! A backend turns a resolved, reduced [`ResourceGraph`] into a [`Script`].
//! Backends never touch the filesystem; persistence belongs to the caller.

pub mod commands;
pub mod kubernetes;
pub mod pcs;

use crate::core::script::Script;
use crate::core::types::ResourceGraph;
use crate::digest;
use crate::error::Result;
use std::path::Path;

/// A cluster-manager script generator.
pub trait Backend {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Render the script for `graph`.
    fn generate(&self, graph: &ResourceGraph) -> Result<Script>;
}

/// Target cluster manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BackendKind {
    /// Pacemaker via `pcs`
    #[default]
    Pcs,
    /// Container scheduler via `kubectl`
    #[value(alias = "k8s")]
    Kubernetes,
}

impl BackendKind {
    /// Build the backend for a script written to `output`.
    pub fn build(self, output: &Path, provenance: Option<Provenance>) -> Box<dyn Backend> {
        match self {
            Self::Pcs => {
                let backend = pcs::PcsBackend::for_output(output);
                Box::new(match provenance {
                    Some(p) => backend.with_provenance(p),
                    None => backend,
                })
            }
            Self::Kubernetes => {
                let backend = kubernetes::KubernetesBackend::default();
                Box::new(match provenance {
                    Some(p) => backend.with_provenance(p),
                    None => backend,
                })
            }
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pcs => write!(f, "pcs"),
            Self::Kubernetes => write!(f, "kubernetes"),
        }
    }
}

/// Digests of the inputs a script was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub spec_digest: String,
    pub vars_digest: String,
}

impl Provenance {
    /// Hash both input files. A failure names whichever file could not be read.
    pub fn from_files(spec: &Path, vars: &Path) -> Result<Self> {
        Ok(Self {
            spec_digest: digest::hash_file(spec)?,
            vars_digest: digest::hash_file(vars)?,
        })
    }

    /// Comment lines stamped under the shebang.
    pub fn header_lines(&self, backend: &str) -> Vec<String> {
        vec![
            format!("# Generated by hagen {} ({} backend)", env!("CARGO_PKG_VERSION"), backend),
            format!("# spec: {}", digest::short(&self.spec_digest)),
            format!("# vars: {}", digest::short(&self.vars_digest)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backends_kind_names() {
        assert_eq!(BackendKind::Pcs.to_string(), "pcs");
        assert_eq!(BackendKind::Kubernetes.to_string(), "kubernetes");
        assert_eq!(BackendKind::default(), BackendKind::Pcs);
    }

    #[test]
    fn test_backends_build() {
        let out = Path::new("/tmp/ha.sh");
        assert_eq!(BackendKind::Pcs.build(out, None).name(), "pcs");
        assert_eq!(BackendKind::Kubernetes.build(out, None).name(), "kubernetes");
    }

    #[test]
    fn test_backends_provenance_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("spec.json");
        let vars = dir.path().join("vars.yaml");
        std::fs::write(&spec, "{}").unwrap();
        std::fs::write(&vars, "a: 1\n").unwrap();

        let p = Provenance::from_files(&spec, &vars).unwrap();
        assert_eq!(p.spec_digest, digest::hash_bytes(b"{}"));
        let header = p.header_lines("pcs");
        assert_eq!(header.len(), 3);
        assert!(header.iter().all(|l| l.starts_with("# ")));
        assert!(header[1].starts_with("# spec: blake3:"));
    }

    #[test]
    fn test_backends_provenance_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(Provenance::from_files(&missing, &missing).is_err());
    }

    #[test]
    fn test_backends_provenance_reports_failing_vars_path() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("spec.json");
        let vars = dir.path().join("vars.yaml");
        std::fs::write(&spec, "{}").unwrap();
        match Provenance::from_files(&spec, &vars).unwrap_err() {
            crate::error::Error::InvalidInput { path, .. } => assert_eq!(path, vars),
            other => panic!("expected invalid input, got {:?}", other),
        }
    }
}

//! CLI subcommands: generate, validate, closure, order.

use crate::backends::BackendKind;
use crate::core::compile::{self, CompileOptions};
use crate::core::reducer::{self, ClosurePolicy};
use crate::core::resolver::MissingVars;
use crate::error::Result;
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a cluster setup script
    Generate {
        /// Compiled resource graph (JSON, or YAML by extension)
        #[arg(short, long)]
        spec: PathBuf,

        /// Script to write
        #[arg(short, long)]
        output: PathBuf,

        /// Deployment variables (YAML)
        #[arg(short, long)]
        args: PathBuf,

        /// Target cluster manager
        #[arg(short, long, value_enum, default_value_t)]
        backend: BackendKind,

        /// Only these resources and what they depend on (space separated)
        #[arg(short, long)]
        resources: Option<String>,

        /// Fail on placeholders with no value instead of keeping them
        #[arg(long)]
        strict_vars: bool,

        /// Relations followed when expanding --resources
        #[arg(long, value_enum, default_value_t)]
        closure: ClosurePolicy,
    },

    /// Load and resolve a spec, report problems without generating
    Validate {
        /// Compiled resource graph
        #[arg(short, long)]
        spec: PathBuf,

        /// Deployment variables (YAML)
        #[arg(short, long)]
        args: PathBuf,

        /// Treat placeholders with no value as errors
        #[arg(long)]
        strict_vars: bool,
    },

    /// Print the dependency closure of a resource subset
    Closure {
        /// Compiled resource graph
        #[arg(short, long)]
        spec: PathBuf,

        /// Resources to expand (space separated)
        #[arg(short, long)]
        resources: String,

        /// Relations followed when expanding
        #[arg(long, value_enum, default_value_t)]
        closure: ClosurePolicy,
    },

    /// Print a start order honoring every order edge
    Order {
        /// Compiled resource graph
        #[arg(short, long)]
        spec: PathBuf,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Generate {
            spec,
            output,
            args,
            backend,
            resources,
            strict_vars,
            closure,
        } => {
            let mut opts = CompileOptions::new(spec, output, args);
            opts.backend = backend;
            opts.subset = resources.as_deref().map(reducer::parse_subset);
            opts.missing_vars = missing_vars(strict_vars);
            opts.closure = closure;
            cmd_generate(&opts)
        }
        Commands::Validate {
            spec,
            args,
            strict_vars,
        } => cmd_validate(&spec, &args, missing_vars(strict_vars)),
        Commands::Closure {
            spec,
            resources,
            closure,
        } => cmd_closure(&spec, &resources, closure),
        Commands::Order { spec } => cmd_order(&spec),
    }
}

fn missing_vars(strict: bool) -> MissingVars {
    if strict {
        MissingVars::Fail
    } else {
        MissingVars::Keep
    }
}

fn cmd_generate(opts: &CompileOptions) -> Result<()> {
    let script = compile::compile(opts)?;
    println!(
        "Wrote {} ({} backend, {} commands)",
        opts.output.display(),
        opts.backend,
        script.commands().count()
    );
    Ok(())
}

fn cmd_validate(spec: &Path, args: &Path, policy: MissingVars) -> Result<()> {
    let report = compile::check(spec, args, policy)?;
    for w in &report.warnings {
        eprintln!("  WARNING: {}", w);
    }
    println!(
        "OK: {} ({} resources, {} order edges, {} colocation edges)",
        spec.display(),
        report.graph.resources.len(),
        report.graph.predecessor_edges.len(),
        report.graph.colocation_edges.len()
    );
    Ok(())
}

fn cmd_closure(spec: &Path, resources: &str, policy: ClosurePolicy) -> Result<()> {
    let members = compile::closure_of(spec, &reducer::parse_subset(resources), policy)?;
    for name in &members {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_order(spec: &Path) -> Result<()> {
    for (i, name) in compile::start_order_of(spec)?.iter().enumerate() {
        println!("{:>3}. {}", i + 1, name);
    }
    Ok(())
}

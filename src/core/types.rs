//! Resource graph types for the compiled HA description.
//!
//! Field names follow the document emitted by the upstream HA rule compiler
//! (`predecessors_edge`, `isolate_resources`, ...). All maps are
//! order-preserving: enumeration order drives emission order.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Graph
// ============================================================================

/// The compiled specification: resources plus ordering/colocation edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGraph {
    /// Resource declarations keyed by unique name
    pub resources: IndexMap<String, ResourceSpec>,

    /// `(from, to)`: `from` must start before `to`
    #[serde(rename = "predecessors_edge", alias = "predecessor_edges", default)]
    pub predecessor_edges: Vec<Edge>,

    /// `(a, b)`: both must run on the same node
    #[serde(default)]
    pub colocation_edges: Vec<Edge>,

    /// Resources with no edges at all
    #[serde(rename = "isolate_resources", alias = "isolated_resources", default)]
    pub isolated_resources: IndexSet<String>,
}

/// A directed pair of resource names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge(pub String, pub String);

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self(from.into(), to.into())
    }

    /// True when both endpoints satisfy `keep`.
    pub fn within(&self, keep: impl Fn(&str) -> bool) -> bool {
        keep(&self.0) && keep(&self.1)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

// ============================================================================
// Resources
// ============================================================================

/// One cluster resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Resource agent and its operation timings
    pub provider: Provider,

    /// Resource-agent parameters, emitted as `key=value`
    #[serde(default, deserialize_with = "scalar_map")]
    pub parameters: IndexMap<String, String>,

    /// Meta attributes, attached verbatim to the create command
    #[serde(default, deserialize_with = "scalar_map")]
    pub metadata: IndexMap<String, String>,

    /// Replication mode, clone limits and placement
    pub ha: Ha,

    /// Names this resource awaits or co-locates with
    #[serde(default)]
    pub dependencies: Dependencies,
}

/// Resource agent reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    /// Agent identifier, e.g. `ocf:heartbeat:IPaddr2`
    pub name: String,

    /// `[start, monitor, stop]` timeouts as written
    pub timeouts: [Seconds; 3],

    /// Monitor interval as written
    pub interval: Seconds,
}

impl Provider {
    pub fn start_timeout(&self) -> &Seconds {
        &self.timeouts[0]
    }

    pub fn monitor_timeout(&self) -> &Seconds {
        &self.timeouts[1]
    }

    pub fn stop_timeout(&self) -> &Seconds {
        &self.timeouts[2]
    }
}

/// High-availability section of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ha {
    pub mode: HaMode,

    #[serde(default)]
    pub clones: Option<Clones>,

    /// Node name → preference score
    #[serde(default)]
    pub location: IndexMap<String, Score>,
}

/// Replication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaMode {
    ActivePassive,
    ActiveActive,
    MasterSlave,
}

impl fmt::Display for HaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActivePassive => write!(f, "active_passive"),
            Self::ActiveActive => write!(f, "active_active"),
            Self::MasterSlave => write!(f, "master_slave"),
        }
    }
}

/// Clone / master limits.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Clones {
    #[serde(default)]
    pub active: Option<CloneLimits>,

    /// Only for master_slave
    #[serde(default)]
    pub master: Option<CloneLimits>,

    /// Extra clone/master options
    #[serde(default, deserialize_with = "scalar_map")]
    pub parameters: IndexMap<String, String>,
}

/// `[node_max, max]` pair as written in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct CloneLimits {
    pub node_max: u32,
    pub max: u32,
}

impl From<[u32; 2]> for CloneLimits {
    fn from(pair: [u32; 2]) -> Self {
        Self {
            node_max: pair[0],
            max: pair[1],
        }
    }
}

impl From<CloneLimits> for [u32; 2] {
    fn from(limits: CloneLimits) -> Self {
        [limits.node_max, limits.max]
    }
}

/// Dependency sets used for closure computation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dependencies {
    #[serde(default)]
    pub predecessors: IndexSet<String>,

    #[serde(default)]
    pub colocation: IndexSet<String>,
}

// ============================================================================
// Scalars
// ============================================================================

/// A duration in seconds, kept textual until generation so placeholder
/// tokens survive loading. Accepts `10`, `"10"` or `"10s"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Scalar", into = "String")]
pub struct Seconds(pub String);

impl Seconds {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse to whole seconds.
    pub fn seconds(&self) -> Result<u64, String> {
        let raw = self.0.trim();
        let digits = raw.strip_suffix('s').unwrap_or(raw);
        digits
            .parse::<u64>()
            .map_err(|_| format!("'{}' is not a number of seconds", self.0))
    }
}

impl From<Scalar> for Seconds {
    fn from(s: Scalar) -> Self {
        Self(s.into())
    }
}

impl From<Seconds> for String {
    fn from(s: Seconds) -> Self {
        s.0
    }
}

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A location preference score, kept textual until generation like
/// [`Seconds`]. Accepts `100`, `"-50"` or `"${prio.node1}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Scalar", into = "String")]
pub struct Score(pub String);

impl Score {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse to a signed integer score.
    pub fn value(&self) -> Result<i64, String> {
        let raw = self.0.trim();
        raw.strip_prefix('+')
            .unwrap_or(raw)
            .parse::<i64>()
            .map_err(|_| format!("'{}' is not an integer score", self.0))
    }
}

impl From<i64> for Score {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl From<Scalar> for Score {
    fn from(s: Scalar) -> Self {
        Self(s.into())
    }
}

impl From<Score> for String {
    fn from(s: Score) -> Self {
        s.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Any scalar document value, carried as its string form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<Scalar> for String {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(x) => x.to_string(),
            Scalar::Text(t) => t,
        }
    }
}

fn scalar_map<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: IndexMap<String, Scalar> = IndexMap::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.into())).collect())
}

// ============================================================================
// Tests
// ============================================================================

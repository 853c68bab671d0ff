//! Pacemaker command templates.
//!
//! Each variant carries typed fields; text is produced only by
//! [`PcsCommand::render`]. Every rendered line is guarded by a check against
//! a cluster snapshot captured when the script runs, so re-running the script
//! does not duplicate state. Templates never validate their input.

use regex::Regex;
use std::sync::LazyLock;

/// Snapshot of live resources, guards create/clone/master.
pub const RESOURCES_VAR: &str = "pcs_resources";
/// Snapshot of live constraints, guards order/colocation.
pub const CONSTRAINTS_VAR: &str = "pcs_status";
/// Snapshot of live location constraints.
pub const LOCATION_VAR: &str = "pcs_location";

static BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_@%+=:,./{}$-]+$").expect("static regex"));

/// One pacemaker command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PcsCommand {
    Create {
        resource: String,
        agent: String,
        params: Vec<(String, String)>,
        meta: Vec<(String, String)>,
        start_timeout: u64,
        monitor_timeout: u64,
        stop_timeout: u64,
        monitor_interval: String,
    },
    Clone {
        resource: String,
        clone_max: u32,
        clone_node_max: u32,
        params: Vec<(String, String)>,
    },
    Master {
        master: String,
        resource: String,
        clone_max: u32,
        clone_node_max: u32,
        master_max: u32,
        master_node_max: u32,
        params: Vec<(String, String)>,
    },
    Location {
        resource: String,
        node: String,
        score: i64,
    },
    Order {
        first: String,
        then: String,
    },
    Colocation {
        first: String,
        second: String,
    },
}

impl PcsCommand {
    /// Short kind label, used in logs and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Clone { .. } => "clone",
            Self::Master { .. } => "master",
            Self::Location { .. } => "location",
            Self::Order { .. } => "order",
            Self::Colocation { .. } => "colocation",
        }
    }

    /// Render against shadow CIB file `cib`.
    pub fn render(&self, cib: &str) -> String {
        let cib = shell_value(cib);
        match self {
            Self::Create {
                resource,
                agent,
                params,
                meta,
                start_timeout,
                monitor_timeout,
                stop_timeout,
                monitor_interval,
            } => {
                let mut parts = vec![
                    guard(RESOURCES_VAR, resource),
                    format!("pcs -f {} resource create {} {}", cib, resource, shell_value(agent)),
                ];
                if !params.is_empty() {
                    parts.push(key_values(params));
                }
                if !meta.is_empty() {
                    parts.push(format!("meta {}", key_values(meta)));
                }
                parts.push(format!(
                    "op monitor timeout={} interval={} op start timeout={} op stop timeout={}",
                    monitor_timeout,
                    shell_value(monitor_interval),
                    start_timeout,
                    stop_timeout
                ));
                parts.join(" ")
            }
            Self::Clone {
                resource,
                clone_max,
                clone_node_max,
                params,
            } => {
                let mut line = format!(
                    "{} pcs -f {} resource clone {} clone-max={} clone-node-max={}",
                    guard(RESOURCES_VAR, &format!("{}-clone", resource)),
                    cib,
                    resource,
                    clone_max,
                    clone_node_max
                );
                append_params(&mut line, params);
                line
            }
            Self::Master {
                master,
                resource,
                clone_max,
                clone_node_max,
                master_max,
                master_node_max,
                params,
            } => {
                let mut line = format!(
                    "{} pcs -f {} resource master {} {} clone-max={} clone-node-max={} \
                     master-max={} master-node-max={}",
                    guard(RESOURCES_VAR, master),
                    cib,
                    master,
                    resource,
                    clone_max,
                    clone_node_max,
                    master_max,
                    master_node_max
                );
                append_params(&mut line, params);
                line
            }
            Self::Location {
                resource,
                node,
                score,
            } => format!(
                "{} pcs -f {} constraint location {} prefers {}={}",
                guard(LOCATION_VAR, resource),
                cib,
                resource,
                shell_value(node),
                score
            ),
            Self::Order { first, then } => format!(
                "{} pcs -f {} constraint order {} then {}",
                guard(CONSTRAINTS_VAR, &format!("start {} then start {}", first, then)),
                cib,
                first,
                then
            ),
            Self::Colocation { first, second } => format!(
                "{} pcs -f {} constraint colocation set {} {}",
                guard(CONSTRAINTS_VAR, &format!("set {} {}", first, second)),
                cib,
                first,
                second
            ),
        }
    }
}

/// `echo "$var" | grep -qE '<pattern>' ||`: skip when already applied.
fn guard(var: &str, needle: &str) -> String {
    format!("echo \"${}\" | grep -qE '{}' ||", var, guard_pattern(needle))
}

/// POSIX ERE matching `needle` literally as a whole whitespace-delimited
/// run, so `db` never matches `db-backup` or `dbx`.
pub fn guard_pattern(needle: &str) -> String {
    format!("(^|[[:space:]]){}([[:space:]]|$)", ere_escape(needle))
}

fn ere_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '.' | '[' | ']' | '{' | '}' | '(' | ')' | '*' | '+' | '?' | '^' | '$' | '|' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn append_params(line: &mut String, params: &[(String, String)]) {
    if !params.is_empty() {
        line.push(' ');
        line.push_str(&key_values(params));
    }
}

/// `k1=v1 k2=v2`, values quoted when needed.
pub fn key_values(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, shell_value(v)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote a value for the shell only when it needs it.
///
/// Double quotes keep `$` live: a placeholder left unresolved still expands
/// from the environment when the script runs.
pub fn shell_value(value: &str) -> String {
    if BARE_RE.is_match(value) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_commands_create() {
        let cmd = PcsCommand::Create {
            resource: "vip".to_string(),
            agent: "ocf:heartbeat:IPaddr2".to_string(),
            params: pairs(&[("ip", "10.0.0.10"), ("cidr_netmask", "24")]),
            meta: pairs(&[("failure-timeout", "10s")]),
            start_timeout: 20,
            monitor_timeout: 10,
            stop_timeout: 16,
            monitor_interval: "10s".to_string(),
        };
        assert_eq!(
            cmd.render("cluster.xml"),
            "echo \"$pcs_resources\" | grep -qE '(^|[[:space:]])vip([[:space:]]|$)' || pcs -f cluster.xml resource create vip \
             ocf:heartbeat:IPaddr2 ip=10.0.0.10 cidr_netmask=24 meta failure-timeout=10s \
             op monitor timeout=10 interval=10s op start timeout=20 op stop timeout=16"
        );
    }

    #[test]
    fn test_commands_create_without_params_or_meta() {
        let cmd = PcsCommand::Create {
            resource: "svc".to_string(),
            agent: "systemd:svc".to_string(),
            params: vec![],
            meta: vec![],
            start_timeout: 2,
            monitor_timeout: 2,
            stop_timeout: 2,
            monitor_interval: "1".to_string(),
        };
        let line = cmd.render("c.xml");
        assert!(line.contains("resource create svc systemd:svc op monitor"));
        assert!(!line.contains("meta"));
    }

    #[test]
    fn test_commands_clone() {
        let cmd = PcsCommand::Clone {
            resource: "web".to_string(),
            clone_max: 2,
            clone_node_max: 1,
            params: pairs(&[("interleave", "true")]),
        };
        assert_eq!(
            cmd.render("c.xml"),
            "echo \"$pcs_resources\" | grep -qE '(^|[[:space:]])web-clone([[:space:]]|$)' || pcs -f c.xml resource clone web \
             clone-max=2 clone-node-max=1 interleave=true"
        );
    }

    #[test]
    fn test_commands_master() {
        let cmd = PcsCommand::Master {
            master: "db_Master".to_string(),
            resource: "db".to_string(),
            clone_max: 2,
            clone_node_max: 1,
            master_max: 1,
            master_node_max: 1,
            params: vec![],
        };
        assert_eq!(
            cmd.render("c.xml"),
            "echo \"$pcs_resources\" | grep -qE '(^|[[:space:]])db_Master([[:space:]]|$)' || pcs -f c.xml resource master \
             db_Master db clone-max=2 clone-node-max=1 master-max=1 master-node-max=1"
        );
    }

    #[test]
    fn test_commands_location() {
        let cmd = PcsCommand::Location {
            resource: "web-clone".to_string(),
            node: "srvnode-1".to_string(),
            score: 100,
        };
        assert_eq!(
            cmd.render("c.xml"),
            "echo \"$pcs_location\" | grep -qE '(^|[[:space:]])web-clone([[:space:]]|$)' || pcs -f c.xml constraint location \
             web-clone prefers srvnode-1=100"
        );
    }

    #[test]
    fn test_commands_order() {
        let cmd = PcsCommand::Order {
            first: "svc1".to_string(),
            then: "svc2-clone".to_string(),
        };
        assert_eq!(
            cmd.render("c.xml"),
            "echo \"$pcs_status\" | grep -qE '(^|[[:space:]])start svc1 then start svc2-clone([[:space:]]|$)' || \
             pcs -f c.xml constraint order svc1 then svc2-clone"
        );
    }

    #[test]
    fn test_commands_colocation() {
        let cmd = PcsCommand::Colocation {
            first: "vip".to_string(),
            second: "db_Master".to_string(),
        };
        assert_eq!(
            cmd.render("c.xml"),
            "echo \"$pcs_status\" | grep -qE '(^|[[:space:]])set vip db_Master([[:space:]]|$)' || \
             pcs -f c.xml constraint colocation set vip db_Master"
        );
    }

    #[test]
    fn test_commands_guard_pattern_is_exact() {
        let live = "  * db-backup\t(ocf:heartbeat:pgsql):\t Started srvnode-1\n  * dbx\t(systemd:dbx):\t Started srvnode-2";
        let db = Regex::new(&guard_pattern("db")).unwrap();
        assert!(!live.lines().any(|l| db.is_match(l)));

        let present = "  * db\t(ocf:heartbeat:pgsql):\t Started srvnode-1";
        assert!(db.is_match(present));
        let clone = Regex::new(&guard_pattern("web-clone")).unwrap();
        assert!(clone.is_match("  * Clone Set: web-clone [web]:"));
        assert!(!clone.is_match("  * Clone Set: web-clone2 [web2]:"));
    }

    #[test]
    fn test_commands_guard_escapes_dots() {
        assert_eq!(guard_pattern("a.b"), "(^|[[:space:]])a\\.b([[:space:]]|$)");
        let dotted = Regex::new(&guard_pattern("a.b")).unwrap();
        assert!(!dotted.is_match("  * axb\t(systemd:axb)"));
        assert!(dotted.is_match("  * a.b\t(systemd:ab)"));
    }

    #[test]
    fn test_commands_order_guard_not_prefix() {
        let re = Regex::new(&guard_pattern("start a then start b")).unwrap();
        assert!(re.is_match("  start a then start b (kind:Mandatory)"));
        assert!(!re.is_match("  start a then start b-clone (kind:Mandatory)"));
    }

    #[test]
    fn test_commands_kind() {
        let cmd = PcsCommand::Order {
            first: "a".to_string(),
            then: "b".to_string(),
        };
        assert_eq!(cmd.kind(), "order");
    }

    #[test]
    fn test_commands_shell_value() {
        assert_eq!(shell_value("10.0.0.1"), "10.0.0.1");
        assert_eq!(shell_value("${cluster_nic}"), "${cluster_nic}");
        assert_eq!(shell_value("two words"), "\"two words\"");
        assert_eq!(shell_value("a\"b"), "\"a\\\"b\"");
        assert_eq!(shell_value("$(id) `x`"), "\"$(id) \\`x\\`\"");
        assert_eq!(shell_value(""), "\"\"");
    }

    #[test]
    fn test_commands_templates_are_pure() {
        let cmd = PcsCommand::Colocation {
            first: "a".to_string(),
            second: "b".to_string(),
        };
        assert_eq!(cmd.render("x.xml"), cmd.render("x.xml"));
    }
}

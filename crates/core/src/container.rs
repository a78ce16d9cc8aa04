// Container resolution for log retrieval
//
// Picks the container whose logs a caller most likely wants when none (or an
// unknown one) was named. The rules run in a fixed order and the first rule that
// produces a name wins. Init containers are only ever chosen by explicit name.

/// Substrings marking infrastructure or sidecar containers.
pub const SIDECAR_DENYLIST: &[&str] = &[
    "init",
    "sidecar",
    "proxy",
    "istio",
    "envoy",
    "fluentd",
    "logspout",
    "filebeat",
    "prometheus",
    "jaeger",
];

/// Name prefix of the service-mesh sidecar injected by Linkerd.
pub const MESH_SIDECAR_PREFIX: &str = "linkerd-";

/// Pod-name marker of the security agent daemonset.
pub const SECURITY_AGENT_MARKER: &str = "defender";

/// The security agent's primary container matches this...
pub const SECURITY_COLLECTOR_PATTERN: &str = "collector";

/// ...unless it is the low-level variant.
pub const SECURITY_COLLECTOR_EXCLUDED: &str = "low-level";

/// Fragments of common primary-container names, highest priority first.
pub const PRIMARY_FRAGMENTS: &[&str] = &["app", "main", "server", "api", "web", "service"];

/// Inputs shared by every rule.
struct Candidates<'a> {
    pod_name: String,
    containers: &'a [String],
    init_containers: &'a [String],
    requested: Option<&'a str>,
    survivors: Vec<&'a String>,
}

type Rule = fn(&Candidates<'_>) -> Option<String>;

/// Resolution rules in precedence order.
const RULES: &[(&str, Rule)] = &[
    ("requested", requested_match),
    ("single-container", single_container),
    ("single-survivor", single_survivor),
    ("security-agent", security_agent_collector),
    ("primary-fragment", primary_fragment),
    ("fallback", fallback),
];

/// Returns true if `name` looks like an infrastructure or sidecar container.
pub fn is_sidecar(name: &str) -> bool {
    let name = name.to_lowercase();
    name.starts_with(MESH_SIDECAR_PREFIX) || SIDECAR_DENYLIST.iter().any(|d| name.contains(d))
}

/// Choose a container of `pod_name` to read logs from.
///
/// `init_containers` are matched against `requested` only. Returns `None` when
/// several non-sidecar containers remain and nothing distinguishes them; the
/// caller then has to ask for an explicit name.
pub fn resolve_container(
    pod_name: &str,
    containers: &[String],
    init_containers: &[String],
    requested: Option<&str>,
) -> Option<String> {
    if containers.is_empty() && init_containers.is_empty() {
        return None;
    }

    let candidates = Candidates {
        pod_name: pod_name.to_lowercase(),
        containers,
        init_containers,
        requested: requested.filter(|r| !r.is_empty()),
        survivors: containers.iter().filter(|c| !is_sidecar(c)).collect(),
    };

    for (rule, select) in RULES {
        if let Some(name) = select(&candidates) {
            tracing::debug!(pod = %pod_name, container = %name, rule = *rule, "Resolved container");
            return Some(name);
        }
    }

    tracing::debug!(
        pod = %pod_name,
        candidates = candidates.survivors.len(),
        "No unambiguous container"
    );
    None
}

fn requested_match(c: &Candidates<'_>) -> Option<String> {
    let requested = c.requested?;
    c.containers
        .iter()
        .chain(c.init_containers)
        .find(|name| name.eq_ignore_ascii_case(requested))
        .cloned()
}

fn single_container(c: &Candidates<'_>) -> Option<String> {
    match c.containers {
        [only] => Some(only.clone()),
        _ => None,
    }
}

fn single_survivor(c: &Candidates<'_>) -> Option<String> {
    match c.survivors.as_slice() {
        [only] => Some((*only).clone()),
        _ => None,
    }
}

fn security_agent_collector(c: &Candidates<'_>) -> Option<String> {
    if !c.pod_name.contains(SECURITY_AGENT_MARKER) {
        return None;
    }
    c.containers
        .iter()
        .find(|name| {
            let name = name.to_lowercase();
            name.contains(SECURITY_COLLECTOR_PATTERN) && !name.contains(SECURITY_COLLECTOR_EXCLUDED)
        })
        .cloned()
}

fn primary_fragment(c: &Candidates<'_>) -> Option<String> {
    PRIMARY_FRAGMENTS.iter().find_map(|fragment| {
        c.survivors
            .iter()
            .find(|name| name.to_lowercase().contains(fragment))
            .map(|name| (*name).clone())
    })
}

// Every container was filtered as a sidecar: take the first one listed.
fn fallback(c: &Candidates<'_>) -> Option<String> {
    if c.survivors.is_empty() {
        c.containers.first().cloned()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sidecar_filtered_leaves_app() {
        let containers = names(&["istio-proxy", "app"]);
        assert_eq!(resolve_container("web-0", &containers, &[], None), Some("app".into()));
    }

    #[test]
    fn test_fragment_scan_prefers_app() {
        let containers = names(&["app", "worker"]);
        assert_eq!(resolve_container("batch-7f9c", &containers, &[], None), Some("app".into()));
    }

    #[test]
    fn test_fragment_order_beats_list_order() {
        let containers = names(&["api-gateway", "main-loop"]);
        assert_eq!(resolve_container("svc", &containers, &[], None), Some("main-loop".into()));
    }

    #[test]
    fn test_no_distinguishing_name_is_ambiguous() {
        let containers = names(&["frontend", "backend"]);
        assert_eq!(resolve_container("shop-1", &containers, &[], None), None);
    }

    #[test]
    fn test_requested_name_is_case_insensitive() {
        let containers = names(&["frontend", "Backend"]);
        assert_eq!(
            resolve_container("shop-1", &containers, &[], Some("BACKEND")),
            Some("Backend".into())
        );
    }

    #[test]
    fn test_requested_name_overrides_denylist() {
        let containers = names(&["istio-proxy", "app"]);
        assert_eq!(
            resolve_container("web-0", &containers, &[], Some("istio-proxy")),
            Some("istio-proxy".into())
        );
    }

    #[test]
    fn test_unknown_requested_name_falls_through() {
        let containers = names(&["linkerd-proxy", "server"]);
        assert_eq!(
            resolve_container("api-0", &containers, &[], Some("nope")),
            Some("server".into())
        );
    }

    #[test]
    fn test_single_container_even_if_denylisted() {
        let containers = names(&["envoy"]);
        assert_eq!(resolve_container("edge", &containers, &[], None), Some("envoy".into()));
    }

    #[test]
    fn test_all_sidecars_falls_back_to_first() {
        let containers = names(&["istio-init", "linkerd-proxy", "fluentd"]);
        assert_eq!(resolve_container("odd", &containers, &[], None), Some("istio-init".into()));
    }

    #[test]
    fn test_mesh_prefix_only_matches_prefix() {
        assert!(is_sidecar("linkerd-proxy"));
        assert!(is_sidecar("Prometheus-Exporter"));
        assert!(!is_sidecar("my-linkerd"));
    }

    #[test]
    fn test_security_agent_prefers_collector() {
        let containers = names(&["low-level-collector", "collector", "reporter"]);
        assert_eq!(
            resolve_container("microsoft-defender-collector-ds-x2k", &containers, &[], None),
            Some("collector".into())
        );
    }

    #[test]
    fn test_collector_pattern_ignored_outside_security_agent() {
        let containers = names(&["collector", "reporter"]);
        assert_eq!(resolve_container("metrics-agent", &containers, &[], None), None);
    }

    #[test]
    fn test_requested_init_container() {
        let containers = names(&["app"]);
        let init = names(&["migrate"]);
        assert_eq!(
            resolve_container("api-0", &containers, &init, Some("Migrate")),
            Some("migrate".into())
        );
    }

    #[test]
    fn test_init_containers_never_chosen_implicitly() {
        let containers = names(&["frontend", "backend"]);
        let init = names(&["app-init"]);
        assert_eq!(resolve_container("shop-1", &containers, &init, None), None);
        assert_eq!(resolve_container("shop-1", &[], &init, None), None);
    }

    #[test]
    fn test_empty_container_list() {
        assert_eq!(resolve_container("empty", &[], &[], Some("app")), None);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let containers = names(&["sidecar-log", "web", "api"]);
        let first = resolve_container("site", &containers, &[], None);
        for _ in 0..10 {
            assert_eq!(resolve_container("site", &containers, &[], None), first);
        }
        assert_eq!(first, Some("api".into()));
    }
}

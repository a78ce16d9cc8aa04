// Configuration projections. Only key names leave the cluster, never values.

use std::collections::BTreeSet;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use serde::Serialize;

use super::{created_at, labels, name, namespace};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapSummary {
    pub name: String,
    pub namespace: String,
    pub keys: Vec<String>,
    pub key_count: usize,
    pub labels: std::collections::BTreeMap<String, String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSummary {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub keys: Vec<String>,
    pub key_count: usize,
    pub labels: std::collections::BTreeMap<String, String>,
    pub created_at: Option<String>,
}

pub fn config_map(c: &ConfigMap) -> ConfigMapSummary {
    let keys: BTreeSet<String> = c
        .data
        .iter()
        .flat_map(|d| d.keys().cloned())
        .chain(c.binary_data.iter().flat_map(|d| d.keys().cloned()))
        .collect();

    ConfigMapSummary {
        name: name(&c.metadata),
        namespace: namespace(&c.metadata),
        key_count: keys.len(),
        keys: keys.into_iter().collect(),
        labels: labels(&c.metadata),
        created_at: created_at(&c.metadata),
    }
}

pub fn secret(s: &Secret) -> SecretSummary {
    let keys: BTreeSet<String> = s
        .data
        .iter()
        .flat_map(|d| d.keys().cloned())
        .chain(s.string_data.iter().flat_map(|d| d.keys().cloned()))
        .collect();

    SecretSummary {
        name: name(&s.metadata),
        namespace: namespace(&s.metadata),
        type_: s.type_.clone().unwrap_or_else(|| "Opaque".to_string()),
        key_count: keys.len(),
        keys: keys.into_iter().collect(),
        labels: labels(&s.metadata),
        created_at: created_at(&s.metadata),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::fixtures;

    #[test]
    fn test_config_map_keys_only() {
        let cm = fixtures::config_map("shop", "web-config", &["LOG_LEVEL", "FEATURES"]);
        let summary = config_map(&cm);
        assert_eq!(summary.keys, vec!["FEATURES", "LOG_LEVEL"]);
        assert_eq!(summary.key_count, 2);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("value-of-"));
    }

    #[test]
    fn test_secret_never_exposes_values() {
        let s = fixtures::secret("shop", "db", &[("username", "admin"), ("password", "hunter2")]);
        let summary = secret(&s);
        assert_eq!(summary.keys, vec!["password", "username"]);
        assert_eq!(summary.type_, "Opaque");

        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("aHVudGVyMg"));
        assert!(!json.contains("admin"));
    }
}

// Namespace projection

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Namespace;
use serde::Serialize;

use super::{created_at, labels, name, UNKNOWN};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSummary {
    pub name: String,
    pub status: String,
    pub labels: BTreeMap<String, String>,
    pub created_at: Option<String>,
}

pub fn namespace(ns: &Namespace) -> NamespaceSummary {
    NamespaceSummary {
        name: name(&ns.metadata),
        status: ns
            .status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        labels: labels(&ns.metadata),
        created_at: created_at(&ns.metadata),
    }
}

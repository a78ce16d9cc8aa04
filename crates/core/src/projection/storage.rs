// Persistent volume projection

use k8s_openapi::api::core::v1::PersistentVolume;
use serde::Serialize;

use super::{created_at, labels, name, UNKNOWN};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeSummary {
    pub name: String,
    pub capacity: Option<String>,
    pub access_modes: Vec<String>,
    pub reclaim_policy: Option<String>,
    pub storage_class: Option<String>,
    pub status: String,
    /// Bound claim as `namespace/name`.
    pub claim: Option<String>,
    pub labels: std::collections::BTreeMap<String, String>,
    pub created_at: Option<String>,
}

pub fn persistent_volume(pv: &PersistentVolume) -> PersistentVolumeSummary {
    let spec = pv.spec.as_ref();
    PersistentVolumeSummary {
        name: name(&pv.metadata),
        capacity: spec
            .and_then(|s| s.capacity.as_ref())
            .and_then(|c| c.get("storage"))
            .map(|q| q.0.clone()),
        access_modes: spec.and_then(|s| s.access_modes.clone()).unwrap_or_default(),
        reclaim_policy: spec.and_then(|s| s.persistent_volume_reclaim_policy.clone()),
        storage_class: spec.and_then(|s| s.storage_class_name.clone()),
        status: pv
            .status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        claim: spec.and_then(|s| s.claim_ref.as_ref()).map(|c| {
            format!(
                "{}/{}",
                c.namespace.as_deref().unwrap_or_default(),
                c.name.as_deref().unwrap_or_default()
            )
        }),
        labels: labels(&pv.metadata),
        created_at: created_at(&pv.metadata),
    }
}

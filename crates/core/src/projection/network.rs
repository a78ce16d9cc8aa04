// Network projections: services and ingresses

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::{HTTPIngressPath, Ingress};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::Serialize;

use super::{created_at, labels, name, namespace};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub cluster_ip: Option<String>,
    pub external_ips: Vec<String>,
    pub load_balancer_ingress: Vec<String>,
    pub ports: Vec<ServicePortSummary>,
    pub selector: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePortSummary {
    pub name: Option<String>,
    pub port: i32,
    pub target_port: Option<String>,
    pub protocol: String,
    pub node_port: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressSummary {
    pub name: String,
    pub namespace: String,
    pub class: Option<String>,
    pub rules: Vec<IngressRuleSummary>,
    pub tls: Vec<IngressTlsSummary>,
    pub addresses: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressRuleSummary {
    /// `None` matches every host.
    pub host: Option<String>,
    pub paths: Vec<IngressPathSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressPathSummary {
    pub path: String,
    pub path_type: String,
    /// `service:port`, or the resource kind/name for resource backends.
    pub backend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressTlsSummary {
    pub hosts: Vec<String>,
    pub secret_name: Option<String>,
}

pub fn service(s: &Service) -> ServiceSummary {
    let spec = s.spec.as_ref();
    ServiceSummary {
        name: name(&s.metadata),
        namespace: namespace(&s.metadata),
        type_: spec
            .and_then(|sp| sp.type_.clone())
            .unwrap_or_else(|| "ClusterIP".to_string()),
        cluster_ip: spec.and_then(|sp| sp.cluster_ip.clone()),
        external_ips: spec.and_then(|sp| sp.external_ips.clone()).unwrap_or_default(),
        load_balancer_ingress: s
            .status
            .as_ref()
            .and_then(|st| st.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map(|list| {
                list.iter()
                    .filter_map(|i| i.ip.clone().or_else(|| i.hostname.clone()))
                    .collect()
            })
            .unwrap_or_default(),
        ports: spec
            .and_then(|sp| sp.ports.as_ref())
            .map(|list| {
                list.iter()
                    .map(|p| ServicePortSummary {
                        name: p.name.clone(),
                        port: p.port,
                        target_port: p.target_port.as_ref().map(int_or_string),
                        protocol: p.protocol.clone().unwrap_or_else(|| "TCP".to_string()),
                        node_port: p.node_port,
                    })
                    .collect()
            })
            .unwrap_or_default(),
        selector: spec.and_then(|sp| sp.selector.clone()).unwrap_or_default(),
        labels: labels(&s.metadata),
        created_at: created_at(&s.metadata),
    }
}

pub fn ingress(i: &Ingress) -> IngressSummary {
    let spec = i.spec.as_ref();
    IngressSummary {
        name: name(&i.metadata),
        namespace: namespace(&i.metadata),
        class: spec.and_then(|s| s.ingress_class_name.clone()),
        rules: spec
            .and_then(|s| s.rules.as_ref())
            .map(|rules| {
                rules
                    .iter()
                    .map(|r| IngressRuleSummary {
                        host: r.host.clone(),
                        paths: r
                            .http
                            .as_ref()
                            .map(|h| h.paths.iter().map(ingress_path).collect())
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        tls: spec
            .and_then(|s| s.tls.as_ref())
            .map(|tls| {
                tls.iter()
                    .map(|t| IngressTlsSummary {
                        hosts: t.hosts.clone().unwrap_or_default(),
                        secret_name: t.secret_name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        addresses: i
            .status
            .as_ref()
            .and_then(|st| st.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.ip.clone().or_else(|| a.hostname.clone()))
                    .collect()
            })
            .unwrap_or_default(),
        labels: labels(&i.metadata),
        created_at: created_at(&i.metadata),
    }
}

fn ingress_path(p: &HTTPIngressPath) -> IngressPathSummary {
    let backend = match (&p.backend.service, &p.backend.resource) {
        (Some(svc), _) => {
            let port = svc
                .port
                .as_ref()
                .and_then(|port| port.number.map(|n| n.to_string()).or_else(|| port.name.clone()))
                .unwrap_or_default();
            format!("{}:{}", svc.name, port)
        }
        (None, Some(resource)) => format!("{}/{}", resource.kind, resource.name),
        (None, None) => String::new(),
    };

    IngressPathSummary {
        path: p.path.clone().unwrap_or_else(|| "/".to_string()),
        path_type: p.path_type.clone(),
        backend,
    }
}

fn int_or_string(value: &IntOrString) -> String {
    match value {
        IntOrString::Int(n) => n.to_string(),
        IntOrString::String(s) => s.clone(),
    }
}

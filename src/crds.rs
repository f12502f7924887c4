use std::{collections::BTreeMap, fmt};

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube_derive::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a point-in-time image of a volume is obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum CopyMethod {
    None,
    Clone,
    Snapshot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum AccessMode {
    ReadWriteOnce,
    ReadWriteMany,
    ReadOnlyMany,
}

/// Service type created for incoming SSH connections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    LoadBalancer,
}

impl fmt::Display for CopyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Cron-style schedule. A missing trigger means continuous replication.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct TriggerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

/// Third-party replication provider used instead of the built-in rsync path.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ExternalSpec {
    pub provider: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolumeOptions {
    pub copy_method: CopyMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_modes: Option<Vec<AccessMode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_snapshot_class_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RsyncTransport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_keys: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_user: Option<String>,
}

/// Volume and SSH transport settings of the receiving side of an rsync replication.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DestinationRsyncSpec {
    #[serde(flatten)]
    pub volume: VolumeOptions,
    /// Existing volume to receive the data instead of a provisioned one
    #[serde(
        default,
        rename = "destinationPVC",
        skip_serializing_if = "Option::is_none"
    )]
    pub destination_pvc: Option<String>,
    #[serde(flatten)]
    pub transport: RsyncTransport,
}

/// Volume and SSH transport settings of the sending side of an rsync replication.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct SourceRsyncSpec {
    #[serde(flatten)]
    pub volume: VolumeOptions,
    #[serde(flatten)]
    pub transport: RsyncTransport,
}

#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "scribe.backube",
    version = "v1alpha1",
    kind = "ReplicationDestination",
    namespaced
)]
pub struct ReplicationDestinationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsync: Option<DestinationRsyncSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalSpec>,
}

#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "scribe.backube",
    version = "v1alpha1",
    kind = "ReplicationSource",
    namespaced
)]
pub struct ReplicationSourceSpec {
    /// The volume being protected
    #[serde(rename = "sourcePVC")]
    pub source_pvc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsync: Option<SourceRsyncSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalSpec>,
}

#[cfg(test)]
mod tests {
    use kube::{CustomResourceExt, Resource};

    use super::*;

    #[test]
    fn crd_names() {
        assert_eq!(
            ReplicationDestination::crd_name(),
            "replicationdestinations.scribe.backube"
        );
        assert_eq!(
            ReplicationSource::crd_name(),
            "replicationsources.scribe.backube"
        );
        assert_eq!(ReplicationSource::api_version(&()), "scribe.backube/v1alpha1");
    }

    #[test]
    fn rsync_schema_describes_the_whole_block() {
        let destination = serde_json::to_string(&ReplicationDestination::crd()).unwrap();
        assert!(
            destination.contains("Volume and SSH transport settings of the receiving side")
        );
        let source = serde_json::to_string(&ReplicationSource::crd()).unwrap();
        assert!(source.contains("Volume and SSH transport settings of the sending side"));
        assert!(!source.contains("shared by both sides"));
    }

    #[test]
    fn destination_serializes_wire_names() {
        let spec = ReplicationDestinationSpec {
            trigger: None,
            rsync: Some(DestinationRsyncSpec {
                volume: VolumeOptions {
                    copy_method: CopyMethod::Snapshot,
                    capacity: Some(Quantity("2Gi".to_owned())),
                    storage_class_name: None,
                    access_modes: Some(vec![AccessMode::ReadWriteOnce]),
                    volume_snapshot_class_name: None,
                },
                destination_pvc: Some("data".to_owned()),
                transport: RsyncTransport {
                    service_type: Some(ServiceType::ClusterIP),
                    ..RsyncTransport::default()
                },
            }),
            external: None,
        };

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "rsync": {
                    "copyMethod": "Snapshot",
                    "capacity": "2Gi",
                    "accessModes": ["ReadWriteOnce"],
                    "destinationPVC": "data",
                    "serviceType": "ClusterIP",
                }
            })
        );
    }

    #[test]
    fn source_deserializes_from_server_shape() {
        let source: ReplicationSourceSpec = serde_json::from_value(serde_json::json!({
            "sourcePVC": "mysql-claim",
            "trigger": { "schedule": "*/3 * * * *" },
            "rsync": {
                "copyMethod": "Clone",
                "sshKeys": "scribe-rsync-dest-src-db",
                "port": 22,
            },
            "paused": false,
        }))
        .unwrap();

        assert_eq!(source.source_pvc, "mysql-claim");
        let rsync = source.rsync.unwrap();
        assert_eq!(rsync.volume.copy_method, CopyMethod::Clone);
        assert_eq!(rsync.transport.port, Some(22));
        assert_eq!(
            rsync.transport.ssh_keys.as_deref(),
            Some("scribe-rsync-dest-src-db")
        );
    }
}

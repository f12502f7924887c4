//! Building and submitting ReplicationDestination and ReplicationSource objects.

use std::fmt::Debug;

use k8s_openapi::NamespaceResourceScope;
use kube::{
    Resource, ResourceExt,
    api::{ObjectMeta, PostParams},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info};

use crate::{
    clients::{self, ClusterHandle, DualIdentity},
    config::{Mode, OptionBundle},
    crds::{
        DestinationRsyncSpec, ReplicationDestination, ReplicationDestinationSpec,
        ReplicationSource, ReplicationSourceSpec, RsyncTransport, SourceRsyncSpec, TriggerSpec,
        VolumeOptions,
    },
    error::{Error, Result},
    options::{CommonOptions, normalize},
};

const SOURCE_PVC_REQUIRED: &str =
    "must provide --source-pvc, the name of the existing PersistentVolumeClaim to replicate";
const SSH_SECRET_REQUIRED: &str = "must provide the name of the secret in ReplicationSource namespace that holds the SSHKeys for connecting to the ReplicationDestination namespace";

/// Checks required option combinations. Runs before any client is built.
pub fn validate(bundle: &OptionBundle) -> Result<()> {
    let mode = bundle.mode;
    if bundle.copy_method.is_empty() {
        return Err(Error::validation(format!(
            "must provide --{}; one of 'None|Clone|Snapshot'",
            mode.flag("copy-method")
        )));
    }

    match mode {
        Mode::Destination => {
            let provisioned = !bundle.capacity.is_empty() && !bundle.access_mode.is_empty();
            if !provisioned && bundle.pvc.is_empty() {
                return Err(Error::validation(
                    "must either provide --dest-capacity & --dest-access-mode OR --dest-pvc",
                ));
            }
        }
        Mode::Source => {
            if bundle.pvc.is_empty() {
                return Err(Error::validation(SOURCE_PVC_REQUIRED));
            }
            if bundle.ssh_keys_secret.is_empty() {
                return Err(Error::validation(SSH_SECRET_REQUIRED));
            }
        }
    }
    Ok(())
}

/// The explicit name, or `<namespace>-scribe-<mode>`.
pub fn resource_name(bundle: &OptionBundle, namespace: &str) -> String {
    if bundle.name.is_empty() {
        format!("{namespace}-scribe-{}", bundle.mode)
    } else {
        bundle.name.clone()
    }
}

fn trigger(common: &CommonOptions) -> Option<TriggerSpec> {
    common.schedule.as_ref().map(|schedule| TriggerSpec {
        schedule: Some(schedule.clone()),
    })
}

fn volume_options(common: &CommonOptions) -> VolumeOptions {
    VolumeOptions {
        copy_method: common.copy_method,
        capacity: common.capacity.clone(),
        storage_class_name: common.storage_class_name.clone(),
        access_modes: common.access_modes.clone(),
        volume_snapshot_class_name: common.volume_snapshot_class_name.clone(),
    }
}

fn transport(common: &CommonOptions) -> RsyncTransport {
    RsyncTransport {
        ssh_keys: common.ssh_keys.clone(),
        service_type: Some(common.service_type),
        address: common.address.clone(),
        port: common.port,
        path: common.path.clone(),
        ssh_user: common.ssh_user.clone(),
    }
}

pub fn build_destination(common: &CommonOptions, metadata: ObjectMeta) -> ReplicationDestination {
    let spec = ReplicationDestinationSpec {
        trigger: trigger(common),
        rsync: Some(DestinationRsyncSpec {
            volume: volume_options(common),
            destination_pvc: common.pvc.clone(),
            transport: transport(common),
        }),
        external: common.external.clone(),
    };
    let mut destination = ReplicationDestination::new("", spec);
    destination.metadata = metadata;
    destination
}

pub fn build_source(common: &CommonOptions, metadata: ObjectMeta) -> Result<ReplicationSource> {
    let Some(source_pvc) = common.pvc.clone() else {
        return Err(Error::validation(SOURCE_PVC_REQUIRED));
    };
    let spec = ReplicationSourceSpec {
        source_pvc,
        trigger: trigger(common),
        rsync: Some(SourceRsyncSpec {
            volume: volume_options(common),
            transport: transport(common),
        }),
        external: common.external.clone(),
    };
    let mut source = ReplicationSource::new("", spec);
    source.metadata = metadata;
    Ok(source)
}

fn metadata(bundle: &OptionBundle, handle: &ClusterHandle) -> ObjectMeta {
    let name = resource_name(bundle, handle.namespace());
    debug!(
        "replication {} {name} will be created in {} namespace",
        bundle.mode,
        handle.namespace()
    );
    ObjectMeta {
        name: Some(name),
        namespace: Some(handle.namespace().to_owned()),
        ..ObjectMeta::default()
    }
}

/// One create call through `handle`; server rejections are returned as-is.
pub async fn create<K>(handle: &ClusterHandle, resource: &K) -> Result<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned,
{
    let created = handle
        .api::<K>()
        .create(&PostParams::default(), resource)
        .await
        .map_err(|source| Error::Creation {
            kind: K::kind(&()).into_owned(),
            name: resource.name_any(),
            namespace: handle.namespace().to_owned(),
            source,
        })?;
    info!(
        "{} {} created in namespace {}",
        K::kind(&()),
        created.name_any(),
        handle.namespace()
    );
    Ok(created)
}

pub async fn new_destination(
    bundle: &OptionBundle,
    identity: &DualIdentity,
) -> Result<ReplicationDestination> {
    validate(bundle)?;
    let common = normalize(bundle)?;
    let clusters = clients::complete(identity).await?;

    let destination = build_destination(&common, metadata(bundle, &clusters.destination));
    create(&clusters.destination, &destination).await
}

pub async fn new_source(bundle: &OptionBundle, identity: &DualIdentity) -> Result<ReplicationSource> {
    validate(bundle)?;
    let common = normalize(bundle)?;
    let clusters = clients::complete(identity).await?;

    let source = build_source(&common, metadata(bundle, &clusters.source))?;
    create(&clusters.source, &source).await
}

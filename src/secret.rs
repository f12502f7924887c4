use k8s_openapi::api::core::v1::Secret;
use kube::{
    ResourceExt,
    api::{ListParams, ObjectMeta, PostParams},
};
use tracing::{debug, info};

use crate::{
    clients::{self, ClusterHandle, Clusters, DualIdentity},
    crds::ReplicationDestination,
    error::{Error, Result, is_not_found},
};

/// Prefix of the secret the operator generates for a ReplicationDestination.
pub const SECRET_PREFIX: &str = "scribe-rsync-dest-src-";

/// Picks the secret belonging to the only ReplicationDestination in
/// `namespace`. Several destinations are ambiguous and need an explicit name.
pub fn conventional_name(namespace: &str, destinations: &[ReplicationDestination]) -> Result<String> {
    match destinations {
        [] => Err(Error::not_found(format!(
            "no ReplicationDestination found in namespace {namespace}; pass --ssh-keys-secret"
        ))),
        [destination] => Ok(format!("{SECRET_PREFIX}{}", destination.name_any())),
        many => {
            let mut names = many.iter().map(ResourceExt::name_any).collect::<Vec<_>>();
            names.sort();
            Err(Error::validation(format!(
                "namespace {namespace} holds several ReplicationDestinations ({}); pass --ssh-keys-secret to choose the secret",
                names.join(", ")
            )))
        }
    }
}

/// Resolves the name of the secret to copy.
pub async fn complete(explicit: Option<&str>, destination: &ClusterHandle) -> Result<String> {
    if let Some(name) = explicit {
        return Ok(name.to_owned());
    }
    let destinations = destination
        .api::<ReplicationDestination>()
        .list(&ListParams::default())
        .await?;
    let name = conventional_name(destination.namespace(), &destinations.items)?;
    debug!(%name, "derived SSH secret name from ReplicationDestination");
    Ok(name)
}

/// The same payload under the same name in `namespace`, without owner
/// references or any other server-managed metadata.
pub fn copy_for_namespace(secret: &Secret, namespace: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(secret.name_any()),
            namespace: Some(namespace.to_owned()),
            owner_references: None,
            ..ObjectMeta::default()
        },
        data: secret.data.clone(),
        string_data: secret.string_data.clone(),
        type_: secret.type_.clone(),
        immutable: secret.immutable,
    }
}

/// Reads `name` on the destination side and creates it on the source side.
/// An existing secret on the source side is never overwritten.
pub async fn sync(name: &str, clusters: &Clusters) -> Result<Secret> {
    let original = clusters
        .destination
        .api::<Secret>()
        .get(name)
        .await
        .map_err(|e| {
            if is_not_found(&e) {
                Error::not_found(format!(
                    "secret {name} not found in namespace {}",
                    clusters.destination.namespace()
                ))
            } else {
                Error::Kube(e)
            }
        })?;

    let copy = copy_for_namespace(&original, clusters.source.namespace());
    let created = clusters
        .source
        .api::<Secret>()
        .create(&PostParams::default(), &copy)
        .await
        .map_err(|source| Error::Creation {
            kind: "Secret".to_owned(),
            name: name.to_owned(),
            namespace: clusters.source.namespace().to_owned(),
            source,
        })?;

    info!(
        "secret {name} created in namespace {}",
        clusters.source.namespace()
    );
    Ok(created)
}

pub async fn sync_ssh_secret(explicit: Option<&str>, identity: &DualIdentity) -> Result<Secret> {
    let clusters = clients::complete(identity).await?;
    let name = complete(explicit, &clusters.destination).await?;
    sync(&name, &clusters).await
}

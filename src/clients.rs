use std::{fmt, path::PathBuf};

use k8s_openapi::NamespaceResourceScope;
use kube::{
    Api, Client, Config, Resource,
    config::{KubeConfigOptions, Kubeconfig},
};
use tracing::debug;

use crate::error::{Error, Result};

/// The two independently addressed clusters of a replication pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Destination => f.write_str("destination"),
        }
    }
}

/// Overrides for one side. `None` falls back to the kubeconfig's current
/// context and its namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterIdentity {
    pub context: Option<String>,
    pub cluster: Option<String>,
    pub namespace: Option<String>,
}

impl ClusterIdentity {
    fn options(&self) -> KubeConfigOptions {
        KubeConfigOptions {
            context: self.context.clone(),
            cluster: self.cluster.clone(),
            user: None,
        }
    }

    fn is_ambient(&self) -> bool {
        self.context.is_none() && self.cluster.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DualIdentity {
    /// Kubeconfig file shared by both sides instead of the ambient one
    pub kubeconfig: Option<PathBuf>,
    pub source: ClusterIdentity,
    pub destination: ClusterIdentity,
}

/// An authenticated client bound to the namespace it operates in.
#[derive(Clone)]
pub struct ClusterHandle {
    side: Side,
    client: Client,
    namespace: String,
}

impl ClusterHandle {
    pub(crate) fn new(side: Side, client: Client, namespace: String) -> Self {
        Self {
            side,
            client,
            namespace,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

pub struct Clusters {
    pub source: ClusterHandle,
    pub destination: ClusterHandle,
}

/// Builds both client handles from the ambient kubeconfig, or the one named
/// by `identity.kubeconfig`.
pub async fn complete(identity: &DualIdentity) -> Result<Clusters> {
    let kubeconfig = identity
        .kubeconfig
        .as_ref()
        .map(|path| {
            Kubeconfig::read_from(path).map_err(|source| Error::KubeconfigFile {
                path: path.clone(),
                source,
            })
        })
        .transpose()?;
    complete_with(identity, kubeconfig.as_ref()).await
}

pub async fn complete_with(
    identity: &DualIdentity,
    kubeconfig: Option<&Kubeconfig>,
) -> Result<Clusters> {
    let destination = connect(Side::Destination, &identity.destination, kubeconfig).await?;
    let source = connect(Side::Source, &identity.source, kubeconfig).await?;
    Ok(Clusters {
        source,
        destination,
    })
}

/// Derives the REST configuration for one side with its overrides applied.
pub async fn rest_config(
    side: Side,
    identity: &ClusterIdentity,
    kubeconfig: Option<&Kubeconfig>,
) -> Result<Config> {
    let options = identity.options();
    match kubeconfig {
        Some(kubeconfig) => Config::from_custom_kubeconfig(kubeconfig.clone(), &options)
            .await
            .map_err(|source| Error::Kubeconfig { side, source }),
        None => match Config::from_kubeconfig(&options).await {
            Ok(config) => Ok(config),
            // Load kubeconfig if it's present otherwise fall back to cluster config
            Err(source) if identity.is_ambient() => {
                Config::incluster().map_err(|_| Error::Kubeconfig { side, source })
            }
            Err(source) => Err(Error::Kubeconfig { side, source }),
        },
    }
}

async fn connect(
    side: Side,
    identity: &ClusterIdentity,
    kubeconfig: Option<&Kubeconfig>,
) -> Result<ClusterHandle> {
    let config = rest_config(side, identity, kubeconfig).await?;
    let namespace = identity
        .namespace
        .clone()
        .unwrap_or_else(|| config.default_namespace.clone());
    debug!(%side, url = %config.cluster_url, %namespace, "resolved cluster identity");

    let client = Client::try_from(config).map_err(|source| Error::Client { side, source })?;
    Ok(ClusterHandle::new(side, client, namespace))
}

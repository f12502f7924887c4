use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ReplicationFlags;

/// Asynchronously replicate persistent volumes between clusters or namespaces.
///
/// Every flag may also be set in `config.yaml` in the current directory,
/// keyed by the flag name. Flags given on the command line win.
#[derive(Parser, Debug)]
#[command(name = "scribe", version, about)]
pub struct Cli {
    /// Config file to read instead of ./config.yaml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Default log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "scribe=info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a ReplicationDestination for replicating a persistent volume.
    NewDestination(DestinationArgs),
    /// Create a ReplicationSource for replicating a persistent volume.
    NewSource(SourceArgs),
    /// Copy the SSH secret for rsync between namespaces and/or clusters.
    SyncSshSecret(SyncSecretArgs),
}

/// Where the destination and source sides live.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterArgs {
    /// Kubeconfig file used for both sides instead of $KUBECONFIG or ~/.kube/config
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context of the destination side (default: current context)
    #[arg(long)]
    pub dest_kube_context: Option<String>,

    /// Kubeconfig cluster of the destination side
    #[arg(long)]
    pub dest_kube_clustername: Option<String>,

    /// Namespace of the destination side (default: the context's namespace)
    #[arg(long)]
    pub dest_namespace: Option<String>,

    /// Kubeconfig context of the source side (default: current context)
    #[arg(long)]
    pub source_kube_context: Option<String>,

    /// Kubeconfig cluster of the source side
    #[arg(long)]
    pub source_kube_clustername: Option<String>,

    /// Namespace of the source side (default: the context's namespace)
    #[arg(long)]
    pub source_namespace: Option<String>,
}

/// Transport and provider flags shared by both resource kinds.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportArgs {
    /// The remote address to connect to for replication
    #[arg(long)]
    pub address: Option<String>,

    /// SSH port to connect to for replication (default 22)
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..=65535))]
    pub port: Option<i32>,

    /// The remote path to rsync to (default '/')
    #[arg(long)]
    pub path: Option<String>,

    /// Name of an external replication provider, as 'domain.com/provider'
    #[arg(long)]
    pub provider: Option<String>,

    /// Provider-specific parameters, as 'key/value,key1/value1'
    #[arg(long)]
    pub provider_parameters: Option<String>,

    /// Name of an existing SSH keys secret used for authentication
    #[arg(long)]
    pub ssh_keys_secret: Option<String>,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationArgs {
    /// Method of creating a point-in-time image of the destination volume; one of 'None|Clone|Snapshot'
    #[arg(long)]
    pub dest_copy_method: Option<String>,

    /// Size of the destination volume to create (default 2Gi)
    #[arg(long)]
    pub dest_capacity: Option<String>,

    /// StorageClass of the destination volume (default: the cluster default)
    #[arg(long)]
    pub dest_storage_class_name: Option<String>,

    /// Access mode of the destination volume; one of 'ReadWriteOnce|ReadOnlyMany|ReadWriteMany'
    #[arg(long)]
    pub dest_access_mode: Option<String>,

    /// VolumeSnapshotClass used when the copy method is 'Snapshot'
    #[arg(long)]
    pub dest_volume_snapshot_class: Option<String>,

    /// Existing PVC to receive the data instead of provisioning one
    #[arg(long)]
    pub dest_pvc: Option<String>,

    /// Cronspec scheduling replication; continuous when unset
    #[arg(long)]
    pub dest_cron_spec: Option<String>,

    /// Username for outgoing SSH connections (default 'root')
    #[arg(long)]
    pub dest_ssh_user: Option<String>,

    /// Service type created for incoming SSH connections; one of 'ClusterIP|LoadBalancer'
    #[arg(long)]
    pub dest_service_type: Option<String>,

    /// Name of the ReplicationDestination (default '<namespace>-scribe-destination')
    #[arg(long)]
    pub dest_name: Option<String>,

    #[command(flatten)]
    pub transport: TransportArgs,

    #[command(flatten)]
    pub cluster: ClusterArgs,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceArgs {
    /// Method of creating a point-in-time image of the source volume; one of 'None|Clone|Snapshot'
    #[arg(long)]
    pub source_copy_method: Option<String>,

    /// Overrides the capacity of the point-in-time image
    #[arg(long)]
    pub source_capacity: Option<String>,

    /// Overrides the StorageClass of the point-in-time image
    #[arg(long)]
    pub source_storage_class_name: Option<String>,

    /// Overrides the access mode of the point-in-time image
    #[arg(long)]
    pub source_access_mode: Option<String>,

    /// VolumeSnapshotClass used when the copy method is 'Snapshot'
    #[arg(long)]
    pub source_volume_snapshot_class: Option<String>,

    /// Name of the existing PersistentVolumeClaim to replicate
    #[arg(long)]
    pub source_pvc: Option<String>,

    /// Cronspec scheduling captures of the source volume (default every 3 minutes)
    #[arg(long)]
    pub source_cron_spec: Option<String>,

    /// Username for outgoing SSH connections (default 'root')
    #[arg(long)]
    pub source_ssh_user: Option<String>,

    /// Service type; one of 'ClusterIP|LoadBalancer'
    #[arg(long)]
    pub source_service_type: Option<String>,

    /// Name of the ReplicationSource (default '<namespace>-scribe-source')
    #[arg(long)]
    pub source_name: Option<String>,

    #[command(flatten)]
    pub transport: TransportArgs,

    #[command(flatten)]
    pub cluster: ClusterArgs,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSecretArgs {
    /// Secret to copy (default 'scribe-rsync-dest-src-<destination name>')
    #[arg(long)]
    pub ssh_keys_secret: Option<String>,

    #[command(flatten)]
    pub cluster: ClusterArgs,
}

impl TransportArgs {
    fn into_flags(self, flags: ReplicationFlags) -> ReplicationFlags {
        ReplicationFlags {
            address: self.address,
            port: self.port,
            path: self.path,
            provider: self.provider,
            provider_parameters: self.provider_parameters,
            ssh_keys_secret: self.ssh_keys_secret,
            ..flags
        }
    }
}

impl From<DestinationArgs> for ReplicationFlags {
    fn from(args: DestinationArgs) -> Self {
        args.transport.into_flags(ReplicationFlags {
            name: args.dest_name,
            copy_method: args.dest_copy_method,
            capacity: args.dest_capacity,
            access_mode: args.dest_access_mode,
            storage_class_name: args.dest_storage_class_name,
            volume_snapshot_class: args.dest_volume_snapshot_class,
            pvc: args.dest_pvc,
            cron_spec: args.dest_cron_spec,
            ssh_user: args.dest_ssh_user,
            service_type: args.dest_service_type,
            ..ReplicationFlags::default()
        })
    }
}

impl From<SourceArgs> for ReplicationFlags {
    fn from(args: SourceArgs) -> Self {
        args.transport.into_flags(ReplicationFlags {
            name: args.source_name,
            copy_method: args.source_copy_method,
            capacity: args.source_capacity,
            access_mode: args.source_access_mode,
            storage_class_name: args.source_storage_class_name,
            volume_snapshot_class: args.source_volume_snapshot_class,
            pvc: args.source_pvc,
            cron_spec: args.source_cron_spec,
            ssh_user: args.source_ssh_user,
            service_type: args.source_service_type,
            ..ReplicationFlags::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn destination_flags() {
        let cli = Cli::try_parse_from([
            "scribe",
            "new-destination",
            "--dest-copy-method",
            "Snapshot",
            "--dest-access-mode",
            "ReadWriteOnce",
            "--dest-namespace",
            "dest",
            "--dest-kube-context",
            "scribe-user",
            "--dest-kube-clustername",
            "api-test-test-com:6443",
            "--port",
            "2222",
        ])
        .unwrap();

        let Command::NewDestination(args) = cli.command else {
            panic!("expected new-destination");
        };
        assert_eq!(args.cluster.dest_namespace.as_deref(), Some("dest"));
        assert_eq!(
            args.cluster.dest_kube_clustername.as_deref(),
            Some("api-test-test-com:6443")
        );

        let flags = ReplicationFlags::from(args);
        assert_eq!(flags.copy_method.as_deref(), Some("Snapshot"));
        assert_eq!(flags.access_mode.as_deref(), Some("ReadWriteOnce"));
        assert_eq!(flags.port, Some(2222));
        assert_eq!(flags.capacity, None);
    }

    #[test]
    fn source_flags() {
        let cli = Cli::try_parse_from([
            "scribe",
            "--config",
            "scribe.yaml",
            "new-source",
            "--source-copy-method",
            "Clone",
            "--source-pvc",
            "mysql-pvc",
            "--ssh-keys-secret",
            "keys",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("scribe.yaml")));

        let Command::NewSource(args) = cli.command else {
            panic!("expected new-source");
        };
        let flags = ReplicationFlags::from(args);
        assert_eq!(flags.pvc.as_deref(), Some("mysql-pvc"));
        assert_eq!(flags.ssh_keys_secret.as_deref(), Some("keys"));
        assert_eq!(flags.cron_spec, None);
    }

    #[test]
    fn port_out_of_range() {
        let res = Cli::try_parse_from([
            "scribe",
            "new-destination",
            "--port",
            "70000",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn sync_secret_flags() {
        let cli = Cli::try_parse_from([
            "scribe",
            "sync-ssh-secret",
            "--dest-namespace=dest",
            "--source-namespace=source",
            "--source-kube-context=admin",
        ])
        .unwrap();
        let Command::SyncSshSecret(args) = cli.command else {
            panic!("expected sync-ssh-secret");
        };
        assert_eq!(args.ssh_keys_secret, None);
        assert_eq!(args.cluster.source_kube_context.as_deref(), Some("admin"));
    }
}

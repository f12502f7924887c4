use tracing::debug;

pub mod cli;
pub mod clients;
pub mod config;
pub mod crds;
pub mod error;
pub mod options;
pub mod replication;
pub mod secret;

pub use cli::Cli;
use cli::Command;
use config::{ConfigFile, Mode, ReplicationFlags};
pub use error::{Error, Result};

/// Runs one invocation: resolve options, then a single create against the
/// side that owns the resource.
pub async fn run(cli: Cli) -> Result<()> {
    let config = ConfigFile::discover(cli.config.as_deref())?;
    if let Some(path) = config.path() {
        debug!(path = %path.display(), "using config file");
    }

    match cli.command {
        Command::NewDestination(args) => {
            let identity = config::resolve_identity(&args.cluster, &config)?;
            let bundle = config::resolve(Mode::Destination, &ReplicationFlags::from(args), &config)?;
            replication::new_destination(&bundle, &identity).await?;
        }
        Command::NewSource(args) => {
            let identity = config::resolve_identity(&args.cluster, &config)?;
            let bundle = config::resolve(Mode::Source, &ReplicationFlags::from(args), &config)?;
            replication::new_source(&bundle, &identity).await?;
        }
        Command::SyncSshSecret(args) => {
            let identity = config::resolve_identity(&args.cluster, &config)?;
            let explicit = match args.ssh_keys_secret {
                Some(name) => options::present(&name),
                None => config.get("ssh-keys-secret")?.filter(|n| !n.is_empty()),
            };
            secret::sync_ssh_secret(explicit.as_deref(), &identity).await?;
        }
    };

    Ok(())
}

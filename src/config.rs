//! Layered option resolution.
//!
//! Every option is looked up in order:
//! 1. the flag, when given on the command line
//! 2. the value under the flag's name in the config file
//! 3. the built-in default
//!
//! The config file is `config.yaml` (or `config.yml`) in the current
//! directory unless `--config` names one explicitly.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use serde_yaml::Value;
use tracing::debug;

use crate::{
    cli::ClusterArgs,
    clients::{ClusterIdentity, DualIdentity},
    error::{Error, Result},
    options::present,
};

pub const CONFIG_FILE_NAME: &str = "config";
const CONFIG_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

pub const DEFAULT_DESTINATION_CAPACITY: &str = "2Gi";
pub const DEFAULT_SOURCE_SCHEDULE: &str = "*/3 * * * *";

/// Which replication resource an invocation creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Destination,
    Source,
}

impl Mode {
    pub fn prefix(self) -> &'static str {
        match self {
            Mode::Destination => "dest",
            Mode::Source => "source",
        }
    }

    /// Name of the mode-specific flag, e.g. `dest-copy-method`.
    pub fn flag(self, option: &str) -> String {
        format!("{}-{option}", self.prefix())
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Destination => f.write_str("destination"),
            Mode::Source => f.write_str("source"),
        }
    }
}

/// Fully resolved options for one invocation. Empty strings mean unset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionBundle {
    pub mode: Mode,
    pub name: String,
    pub copy_method: String,
    pub capacity: String,
    pub access_mode: String,
    pub storage_class_name: String,
    pub volume_snapshot_class_name: String,
    pub pvc: String,
    pub schedule: String,
    pub ssh_user: String,
    pub ssh_keys_secret: String,
    pub service_type: String,
    pub address: String,
    pub port: i32,
    pub path: String,
    pub provider: String,
    pub provider_parameters: String,
}

impl OptionBundle {
    /// A bundle with every option unset.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            name: String::new(),
            copy_method: String::new(),
            capacity: String::new(),
            access_mode: String::new(),
            storage_class_name: String::new(),
            volume_snapshot_class_name: String::new(),
            pvc: String::new(),
            schedule: String::new(),
            ssh_user: String::new(),
            ssh_keys_secret: String::new(),
            service_type: String::new(),
            address: String::new(),
            port: 0,
            path: String::new(),
            provider: String::new(),
            provider_parameters: String::new(),
        }
    }
}

/// Options as given on the command line, before layering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplicationFlags {
    pub name: Option<String>,
    pub copy_method: Option<String>,
    pub capacity: Option<String>,
    pub access_mode: Option<String>,
    pub storage_class_name: Option<String>,
    pub volume_snapshot_class: Option<String>,
    pub pvc: Option<String>,
    pub cron_spec: Option<String>,
    pub ssh_user: Option<String>,
    pub service_type: Option<String>,
    pub address: Option<String>,
    pub port: Option<i32>,
    pub path: Option<String>,
    pub provider: Option<String>,
    pub provider_parameters: Option<String>,
    pub ssh_keys_secret: Option<String>,
}

/// Flag-name keyed defaults loaded from the config file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigFile {
    path: Option<PathBuf>,
    values: BTreeMap<String, Value>,
}

impl ConfigFile {
    /// Loads `explicit` if given, otherwise looks for the config file in the
    /// current directory.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Self::discover_in(Path::new(".")),
        }
    }

    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn discover_in(dir: &Path) -> Result<Self> {
        for extension in CONFIG_EXTENSIONS {
            let path = dir.join(CONFIG_FILE_NAME).with_extension(extension);
            if path.is_file() {
                return Self::load(&path);
            }
        }
        debug!(dir = %dir.display(), "no config file found");
        Ok(Self::default())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::parse(path, &contents)?;
        debug!(path = %path.display(), keys = config.values.len(), "loaded config file");
        Ok(config)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let invalid = |message: String| Error::ConfigValue {
            path: path.to_owned(),
            message,
        };

        let mut values = BTreeMap::new();
        if !contents.trim().is_empty() {
            let document: Value =
                serde_yaml::from_str(contents).map_err(|source| Error::ConfigParse {
                    path: path.to_owned(),
                    source,
                })?;
            match document {
                Value::Null => {}
                Value::Mapping(mapping) => {
                    for (key, value) in mapping {
                        match key {
                            Value::String(key) => {
                                values.insert(key, value);
                            }
                            other => {
                                return Err(invalid(format!(
                                    "keys must be flag names, found {other:?}"
                                )));
                            }
                        }
                    }
                }
                other => {
                    return Err(invalid(format!(
                        "expected a mapping of flag names to values, found {other:?}"
                    )));
                }
            }
        }

        Ok(Self {
            path: Some(path.to_owned()),
            values,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The value for `key`, rendered the way it would be typed on the command
    /// line. `null` counts as unset.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let rendered = match self.values.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(other) => {
                return Err(Error::ConfigValue {
                    path: self.path.clone().unwrap_or_default(),
                    message: format!("{key} must be a scalar value, found {other:?}"),
                });
            }
        };
        Ok(rendered)
    }
}

struct Resolver<'a> {
    config: &'a ConfigFile,
}

impl Resolver<'_> {
    fn string(&self, key: &str, explicit: &Option<String>, default: &str) -> Result<String> {
        if let Some(value) = explicit {
            return Ok(value.clone());
        }
        if let Some(value) = self.config.get(key)? {
            debug!(key, %value, "using value from config file");
            return Ok(value);
        }
        Ok(default.to_owned())
    }

    fn optional(&self, key: &str, explicit: &Option<String>) -> Result<Option<String>> {
        Ok(present(&self.string(key, explicit, "")?))
    }

    fn port(&self, key: &str, explicit: Option<i32>) -> Result<i32> {
        if let Some(port) = explicit {
            return Ok(port);
        }
        let Some(value) = self.config.get(key)? else {
            return Ok(0);
        };
        match value.parse::<i32>() {
            Ok(port) if (0..=65535).contains(&port) => Ok(port),
            _ => Err(Error::ConfigValue {
                path: self.config.path.clone().unwrap_or_default(),
                message: format!("{key} must be a port number, found {value}"),
            }),
        }
    }
}

/// Layers `flags` over `config` and the built-in defaults for `mode`.
pub fn resolve(mode: Mode, flags: &ReplicationFlags, config: &ConfigFile) -> Result<OptionBundle> {
    let r = Resolver { config };
    let (default_capacity, default_schedule) = match mode {
        Mode::Destination => (DEFAULT_DESTINATION_CAPACITY, ""),
        Mode::Source => ("", DEFAULT_SOURCE_SCHEDULE),
    };

    Ok(OptionBundle {
        mode,
        name: r.string(&mode.flag("name"), &flags.name, "")?,
        copy_method: r.string(&mode.flag("copy-method"), &flags.copy_method, "")?,
        capacity: r.string(&mode.flag("capacity"), &flags.capacity, default_capacity)?,
        access_mode: r.string(&mode.flag("access-mode"), &flags.access_mode, "")?,
        storage_class_name: r.string(
            &mode.flag("storage-class-name"),
            &flags.storage_class_name,
            "",
        )?,
        volume_snapshot_class_name: r.string(
            &mode.flag("volume-snapshot-class"),
            &flags.volume_snapshot_class,
            "",
        )?,
        pvc: r.string(&mode.flag("pvc"), &flags.pvc, "")?,
        schedule: r.string(&mode.flag("cron-spec"), &flags.cron_spec, default_schedule)?,
        ssh_user: r.string(&mode.flag("ssh-user"), &flags.ssh_user, "")?,
        service_type: r.string(&mode.flag("service-type"), &flags.service_type, "")?,
        ssh_keys_secret: r.string("ssh-keys-secret", &flags.ssh_keys_secret, "")?,
        address: r.string("address", &flags.address, "")?,
        port: r.port("port", flags.port)?,
        path: r.string("path", &flags.path, "")?,
        provider: r.string("provider", &flags.provider, "")?,
        provider_parameters: r.string("provider-parameters", &flags.provider_parameters, "")?,
    })
}

/// Resolves the two cluster identities. An empty value counts as unset so the
/// kubeconfig's current context and namespace apply.
pub fn resolve_identity(args: &ClusterArgs, config: &ConfigFile) -> Result<DualIdentity> {
    let r = Resolver { config };
    let kubeconfig = match &args.kubeconfig {
        Some(path) => Some(path.clone()),
        None => config.get("kubeconfig")?.filter(|p| !p.is_empty()).map(PathBuf::from),
    };

    Ok(DualIdentity {
        kubeconfig,
        destination: ClusterIdentity {
            context: r.optional("dest-kube-context", &args.dest_kube_context)?,
            cluster: r.optional("dest-kube-clustername", &args.dest_kube_clustername)?,
            namespace: r.optional("dest-namespace", &args.dest_namespace)?,
        },
        source: ClusterIdentity {
            context: r.optional("source-kube-context", &args.source_kube_context)?,
            cluster: r.optional("source-kube-clustername", &args.source_kube_clustername)?,
            namespace: r.optional("source-namespace", &args.source_namespace)?,
        },
    })
}

//! Error types for the scribe CLI

use std::path::PathBuf;

use crate::{clients::Side, options::QuantityError};

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure aborts the invocation; nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid config file {path}: {message}")]
    ConfigValue { path: PathBuf, message: String },

    #[error("failed to read kubeconfig {path}: {source}")]
    KubeconfigFile {
        path: PathBuf,
        source: kube::config::KubeconfigError,
    },

    #[error("unable to load kubeconfig for the {side} cluster: {source}")]
    Kubeconfig {
        side: Side,
        source: kube::config::KubeconfigError,
    },

    #[error("unable to create a client for the {side} cluster: {source}")]
    Client { side: Side, source: kube::Error },

    #[error("unrecognized --{flag}: {value}")]
    InvalidOption { flag: String, value: String },

    #[error("error parsing --{flag} {value}: {source}")]
    InvalidQuantity {
        flag: String,
        value: String,
        source: QuantityError,
    },

    #[error(
        "error parsing --provider-parameters {value}, must be passed as key/value,key1/value1..."
    )]
    ProviderParameters { value: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("failed to create {kind} {name} in namespace {namespace}: {source}")]
    Creation {
        kind: String,
        name: String,
        namespace: String,
        source: kube::Error,
    },

    #[error("{message}")]
    NotFound { message: String },

    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
        }
    }

    pub fn invalid_option(flag: impl Into<String>, value: impl Into<String>) -> Self {
        Error::InvalidOption {
            flag: flag.into(),
            value: value.into(),
        }
    }
}

/// Whether a kube error is the API server reporting a missing object.
pub(crate) fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(e) if e.code == 404)
}

//! Normalization of the resolved option bundle into typed resource fields.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use tracing::warn;

use crate::{
    config::{Mode, OptionBundle},
    crds::{AccessMode, CopyMethod, ExternalSpec, ServiceType},
    error::{Error, Result},
};

/// Typed view of an [`OptionBundle`]. No field ever holds `Some("")`.
#[derive(Clone, Debug, PartialEq)]
pub struct CommonOptions {
    pub copy_method: CopyMethod,
    pub capacity: Option<Quantity>,
    pub access_modes: Option<Vec<AccessMode>>,
    pub service_type: ServiceType,
    pub storage_class_name: Option<String>,
    pub volume_snapshot_class_name: Option<String>,
    pub pvc: Option<String>,
    pub schedule: Option<String>,
    pub address: Option<String>,
    pub port: Option<i32>,
    pub path: Option<String>,
    pub ssh_user: Option<String>,
    pub ssh_keys: Option<String>,
    pub external: Option<ExternalSpec>,
}

/// Empty input means "let the operator pick a default".
pub fn present(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

pub fn normalize(bundle: &OptionBundle) -> Result<CommonOptions> {
    let mode = bundle.mode;

    let capacity = present(&bundle.capacity)
        .map(|value| {
            parse_quantity(&value).map_err(|source| Error::InvalidQuantity {
                flag: mode.flag("capacity"),
                value,
                source,
            })
        })
        .transpose()?;

    let access_modes = present(&bundle.access_mode)
        .map(|value| parse_access_mode(mode, &value).map(|m| vec![m]))
        .transpose()?;

    let parameters = parse_provider_parameters(&bundle.provider_parameters)?;
    let external = match present(&bundle.provider) {
        Some(provider) => Some(ExternalSpec {
            provider,
            parameters,
        }),
        None => {
            if !parameters.is_empty() {
                warn!("--provider-parameters given without --provider, ignoring them");
            }
            None
        }
    };

    Ok(CommonOptions {
        copy_method: parse_copy_method(mode, &bundle.copy_method)?,
        capacity,
        access_modes,
        service_type: parse_service_type(mode, &bundle.service_type)?,
        storage_class_name: present(&bundle.storage_class_name),
        volume_snapshot_class_name: present(&bundle.volume_snapshot_class_name),
        pvc: present(&bundle.pvc),
        schedule: present(&bundle.schedule),
        address: present(&bundle.address),
        port: (bundle.port != 0).then_some(bundle.port),
        path: present(&bundle.path),
        ssh_user: present(&bundle.ssh_user),
        ssh_keys: present(&bundle.ssh_keys_secret),
        external,
    })
}

pub fn parse_copy_method(mode: Mode, value: &str) -> Result<CopyMethod> {
    [CopyMethod::None, CopyMethod::Clone, CopyMethod::Snapshot]
        .into_iter()
        .find(|m| m.to_string().eq_ignore_ascii_case(value))
        .ok_or_else(|| Error::invalid_option(mode.flag("copy-method"), value))
}

pub fn parse_access_mode(mode: Mode, value: &str) -> Result<AccessMode> {
    match value {
        "ReadWriteOnce" => Ok(AccessMode::ReadWriteOnce),
        "ReadWriteMany" => Ok(AccessMode::ReadWriteMany),
        "ReadOnlyMany" => Ok(AccessMode::ReadOnlyMany),
        _ => Err(Error::invalid_option(mode.flag("access-mode"), value)),
    }
}

pub fn parse_service_type(mode: Mode, value: &str) -> Result<ServiceType> {
    match value {
        "" | "ClusterIP" | "clusterip" | "clusterIP" => Ok(ServiceType::ClusterIP),
        "LoadBalancer" | "loadbalancer" | "Loadbalancer" => Ok(ServiceType::LoadBalancer),
        _ => Err(Error::invalid_option(mode.flag("service-type"), value)),
    }
}

/// Parses `key/value,key1/value1,...`. A pair must hold exactly one `/`, which
/// also catches a missing `,` between two pairs.
pub fn parse_provider_parameters(value: &str) -> Result<BTreeMap<String, String>> {
    if value.is_empty() {
        return Ok(BTreeMap::new());
    }
    value
        .split(',')
        .map(|pair| match pair.split_once('/') {
            Some((key, val)) if !key.is_empty() && !val.contains('/') => {
                Ok((key.to_owned(), val.to_owned()))
            }
            _ => Err(Error::ProviderParameters {
                value: value.to_owned(),
            }),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("quantity is empty")]
    Empty,
    #[error("quantity has no numeric part")]
    MissingNumber,
    #[error("unable to parse quantity's suffix {0:?}")]
    InvalidSuffix(String),
}

const BINARY_SUFFIXES: [&str; 6] = ["Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];
const DECIMAL_SUFFIXES: [&str; 7] = ["m", "k", "M", "G", "T", "P", "E"];

/// Checks `value` against the Kubernetes quantity grammar:
/// `[+-]?(digits | digits.digits? | .digits)` followed by an optional binary
/// SI, decimal SI or `e<exponent>` suffix.
pub fn parse_quantity(value: &str) -> std::result::Result<Quantity, QuantityError> {
    let s = value.trim();
    if s.is_empty() {
        return Err(QuantityError::Empty);
    }

    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let number_len = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);

    let mut parts = number.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return Err(QuantityError::MissingNumber);
    }

    if !valid_suffix(suffix) {
        return Err(QuantityError::InvalidSuffix(suffix.to_owned()));
    }
    Ok(Quantity(s.to_owned()))
}

fn valid_suffix(suffix: &str) -> bool {
    if suffix.is_empty() || BINARY_SUFFIXES.contains(&suffix) || DECIMAL_SUFFIXES.contains(&suffix)
    {
        return true;
    }
    match suffix.strip_prefix(['e', 'E']) {
        Some(exponent) => {
            let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn destination() -> OptionBundle {
        OptionBundle {
            copy_method: "Snapshot".to_owned(),
            capacity: "2Gi".to_owned(),
            access_mode: "ReadWriteOnce".to_owned(),
            ..OptionBundle::new(Mode::Destination)
        }
    }

    #[test]
    fn copy_method_ignores_case() {
        for (inputs, expected) in [
            (["none", "None", "NONE"], CopyMethod::None),
            (["clone", "Clone", "cLoNe"], CopyMethod::Clone),
            (["snapshot", "Snapshot", "SnapShot"], CopyMethod::Snapshot),
        ] {
            for input in inputs {
                assert_eq!(
                    parse_copy_method(Mode::Source, input).unwrap(),
                    expected,
                    "{input}"
                );
            }
        }
    }

    #[test]
    fn copy_method_rejects_unknown() {
        let err = parse_copy_method(Mode::Destination, "rsync").unwrap_err();
        assert!(matches!(
            &err,
            Error::InvalidOption { flag, value } if flag == "dest-copy-method" && value == "rsync"
        ));
    }

    #[test]
    fn access_mode_is_case_sensitive() {
        assert_eq!(
            parse_access_mode(Mode::Destination, "ReadOnlyMany").unwrap(),
            AccessMode::ReadOnlyMany
        );
        let err = parse_access_mode(Mode::Source, "readwriteonce").unwrap_err();
        assert_eq!(err.to_string(), "unrecognized --source-access-mode: readwriteonce");
    }

    #[test]
    fn service_type_aliases() {
        for alias in ["", "ClusterIP", "clusterip", "clusterIP"] {
            assert_eq!(
                parse_service_type(Mode::Destination, alias).unwrap(),
                ServiceType::ClusterIP
            );
        }
        for alias in ["LoadBalancer", "loadbalancer", "Loadbalancer"] {
            assert_eq!(
                parse_service_type(Mode::Destination, alias).unwrap(),
                ServiceType::LoadBalancer
            );
        }
        assert!(parse_service_type(Mode::Destination, "NodePort").is_err());
        assert!(parse_service_type(Mode::Destination, "CLUSTERIP").is_err());
    }

    #[test]
    fn provider_parameters() {
        let parsed = parse_provider_parameters("region/us-east,bucket/my-bucket").unwrap();
        assert_eq!(
            parsed,
            BTreeMap::from([
                ("region".to_owned(), "us-east".to_owned()),
                ("bucket".to_owned(), "my-bucket".to_owned()),
            ])
        );

        let parsed = parse_provider_parameters("prefix/").unwrap();
        assert_eq!(parsed["prefix"], "");

        assert!(parse_provider_parameters("").unwrap().is_empty());
    }

    #[test]
    fn malformed_provider_parameters_report_whole_string() {
        for input in [
            "region-us-east",
            "region/us-eastbucket/my-bucket",
            "a/b,",
            "/v",
            "a/b,,c/d",
        ] {
            match parse_provider_parameters(input).unwrap_err() {
                Error::ProviderParameters { value } => assert_eq!(value, input),
                other => panic!("unexpected error for {input}: {other}"),
            }
        }
    }

    #[test]
    fn quantities() {
        for ok in ["2Gi", "500Mi", "1", "1.5G", ".5", "100m", "1e3", "2E-2", "+1Ki", "10k"] {
            assert_eq!(parse_quantity(ok).unwrap(), Quantity(ok.to_owned()), "{ok}");
        }
        assert_eq!(parse_quantity(""), Err(QuantityError::Empty));
        assert_eq!(parse_quantity("Gi"), Err(QuantityError::MissingNumber));
        assert_eq!(parse_quantity("1.2.3"), Err(QuantityError::MissingNumber));
        assert_eq!(
            parse_quantity("2GB"),
            Err(QuantityError::InvalidSuffix("GB".to_owned()))
        );
        assert!(parse_quantity("1e").is_err());
        assert!(parse_quantity("2 Gi").is_err());
    }

    #[test]
    fn normalize_destination_scenario() {
        let common = normalize(&destination()).unwrap();
        assert_eq!(common.copy_method, CopyMethod::Snapshot);
        assert_eq!(common.capacity, Some(Quantity("2Gi".to_owned())));
        assert_eq!(common.access_modes, Some(vec![AccessMode::ReadWriteOnce]));
        assert_eq!(common.service_type, ServiceType::ClusterIP);
        assert_eq!(common.schedule, None);
        assert_eq!(common.external, None);
        assert_eq!(common.port, None);
    }

    #[test]
    fn empty_strings_become_absent() {
        let common = normalize(&OptionBundle {
            capacity: String::new(),
            access_mode: String::new(),
            ..destination()
        })
        .unwrap();
        assert_eq!(common.capacity, None);
        assert_eq!(common.access_modes, None);
        assert_eq!(common.storage_class_name, None);
        assert_eq!(common.address, None);
        assert_eq!(common.ssh_keys, None);
        assert_eq!(common.path, None);
    }

    #[test]
    fn bad_capacity_propagates_parser_error() {
        let err = normalize(&OptionBundle {
            capacity: "lots".to_owned(),
            ..destination()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidQuantity { ref flag, ref value, source: QuantityError::MissingNumber }
                if flag == "dest-capacity" && value == "lots"
        ));
    }

    #[test]
    fn external_only_with_provider() {
        let bundle = OptionBundle {
            provider_parameters: "region/us-east".to_owned(),
            ..destination()
        };
        assert_eq!(normalize(&bundle).unwrap().external, None);

        let common = normalize(&OptionBundle {
            provider: "example.com/s3".to_owned(),
            ..bundle
        })
        .unwrap();
        let external = common.external.unwrap();
        assert_eq!(external.provider, "example.com/s3");
        assert_eq!(external.parameters["region"], "us-east");
    }

    #[test]
    fn port_and_schedule() {
        let common = normalize(&OptionBundle {
            port: 2222,
            schedule: "*/5 * * * *".to_owned(),
            ..destination()
        })
        .unwrap();
        assert_eq!(common.port, Some(2222));
        assert_eq!(common.schedule.as_deref(), Some("*/5 * * * *"));
    }
}

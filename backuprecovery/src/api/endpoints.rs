//! Service URL resolution

use std::fmt;
use std::str::FromStr;
use url::Url;

use super::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointType {
    #[default]
    Public,
    Private,
}

impl FromStr for EndpointType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" | "" => Ok(EndpointType::Public),
            "private" => Ok(EndpointType::Private),
            other => Err(ApiError::InvalidEndpoint(format!(
                "endpoint_type must be public or private, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointType::Public => write!(f, "public"),
            EndpointType::Private => write!(f, "private"),
        }
    }
}

/// Base URL of a Backup Recovery instance
pub fn instance_url(instance_id: &str, region: &str, endpoint_type: EndpointType) -> String {
    match endpoint_type {
        EndpointType::Public => format!(
            "https://{}.{}.backup-recovery.cloud.ibm.com/v2",
            instance_id, region
        ),
        EndpointType::Private => format!(
            "https://{}.private.{}.backup-recovery.cloud.ibm.com/v2",
            instance_id, region
        ),
    }
}

/// Picks the service URL: an explicit endpoint wins, otherwise one is built
/// from the instance ID and region
pub fn resolve(
    endpoint: Option<&str>,
    instance_id: Option<&str>,
    region: Option<&str>,
    endpoint_type: EndpointType,
) -> Result<String, ApiError> {
    let url = match (endpoint, instance_id, region) {
        (Some(endpoint), _, _) => endpoint.trim_end_matches('/').to_string(),
        (None, Some(instance_id), Some(region)) => instance_url(instance_id, region, endpoint_type),
        _ => {
            return Err(ApiError::InvalidEndpoint(
                "set endpoint, or both instance_id and region".to_string(),
            ))
        }
    };
    validate(&url)?;
    Ok(url)
}

pub fn validate(endpoint: &str) -> Result<(), ApiError> {
    let parsed = Url::parse(endpoint)
        .map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ApiError::InvalidEndpoint(format!(
            "{}: unsupported scheme {}",
            endpoint, scheme
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_public_and_private_instance_urls() {
        assert_eq!(
            instance_url("abc123", "us-east", EndpointType::Public),
            "https://abc123.us-east.backup-recovery.cloud.ibm.com/v2"
        );
        assert_eq!(
            instance_url("abc123", "us-east", EndpointType::Private),
            "https://abc123.private.us-east.backup-recovery.cloud.ibm.com/v2"
        );
    }

    #[test]
    fn explicit_endpoint_wins() {
        let url = resolve(
            Some("https://brs.example.com/v2/"),
            Some("abc"),
            Some("eu-de"),
            EndpointType::Private,
        )
        .unwrap();
        assert_eq!(url, "https://brs.example.com/v2");
    }

    #[test]
    fn missing_region_is_rejected() {
        assert!(resolve(None, Some("abc"), None, EndpointType::Public).is_err());
        assert!(resolve(Some("ftp://brs"), None, None, EndpointType::Public).is_err());
    }

    #[test]
    fn endpoint_type_parses() {
        assert_eq!("PRIVATE".parse::<EndpointType>().unwrap(), EndpointType::Private);
        assert!("vpn".parse::<EndpointType>().is_err());
    }
}

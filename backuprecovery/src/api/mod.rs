//! Backup Recovery REST API bindings

pub mod alert_resolutions;
pub mod alerts;
pub mod auth;
pub mod client;
pub mod clusters;
pub mod common;
pub mod endpoints;
pub mod error;
pub mod pool;
pub mod protection_groups;
pub mod sources;
pub mod upgrades;
pub mod users;

pub use auth::{Authenticator, BearerAuthenticator, IamAuthenticator, DEFAULT_IAM_URL};
pub use client::{Client, RetryConfig};
pub use common::{ApiQueryParams, KeyValuePair, RequestOptions};
pub use endpoints::EndpointType;
pub use error::ApiError;

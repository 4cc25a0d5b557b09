//! Resource implementations

pub mod alert_resolution;
pub mod common;
pub mod connector_update_user;
pub mod protection_group;
pub mod source_registration;

pub use alert_resolution::AlertResolutionResource;
pub use connector_update_user::ConnectorUpdateUserResource;
pub use protection_group::ProtectionGroupResource;
pub use source_registration::SourceRegistrationResource;

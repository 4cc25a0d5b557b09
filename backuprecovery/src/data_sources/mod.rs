//! Data source implementations

pub mod alert_resolutions;
pub mod alerts;
pub mod cluster_info;
pub mod connector_users;
pub mod protection_groups;
pub mod source_registrations;
pub mod upgrades_info;

pub use alert_resolutions::AlertResolutionsDataSource;
pub use alerts::AlertsDataSource;
pub use cluster_info::ClusterInfoDataSource;
pub use connector_users::ConnectorUsersDataSource;
pub use protection_groups::ProtectionGroupsDataSource;
pub use source_registrations::SourceRegistrationsDataSource;
pub use upgrades_info::UpgradesInfoDataSource;

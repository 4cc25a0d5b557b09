//! Provider data passed to resources and data sources

use crate::api::Client;
use std::sync::Arc;

/// One client per service instance, all sharing the same credentials
#[derive(Clone)]
pub struct BackupRecoveryProviderData {
    /// Protection groups and source registrations
    pub client: Arc<Client>,
    /// Alerts, alert resolutions, upgrades and cluster info
    pub manager_client: Arc<Client>,
    /// Connector users
    pub connector_client: Arc<Client>,
}

impl BackupRecoveryProviderData {
    pub fn new(client: Client, manager_client: Client, connector_client: Client) -> Self {
        Self {
            client: Arc::new(client),
            manager_client: Arc::new(manager_client),
            connector_client: Arc::new(connector_client),
        }
    }

    /// All three APIs served from one endpoint
    pub fn single(client: Client) -> Self {
        Self::new(client.clone(), client.clone(), client)
    }
}

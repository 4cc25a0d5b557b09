//! Alert API implementation

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiQueryParams, KeyValuePair, RequestOptions};
use super::error::ApiError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDocument {
    pub alert_cause: Option<String>,
    pub alert_description: Option<String>,
    pub alert_help_text: Option<String>,
    pub alert_name: Option<String>,
    pub alert_summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertInfo {
    pub id: Option<String>,
    pub alert_category: Option<String>,
    pub alert_code: Option<String>,
    pub alert_document: Option<AlertDocument>,
    pub alert_state: Option<String>,
    pub alert_type: Option<i64>,
    pub alert_type_bucket: Option<String>,
    pub cluster_id: Option<i64>,
    pub cluster_name: Option<String>,
    pub dedup_count: Option<i64>,
    pub first_timestamp_usecs: Option<i64>,
    pub latest_timestamp_usecs: Option<i64>,
    pub property_list: Option<Vec<KeyValuePair>>,
    pub region_id: Option<String>,
    pub resolution_id_string: Option<String>,
    pub severity: Option<String>,
    pub tenant_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct AlertList {
    #[serde(default)]
    alerts: Option<Vec<AlertInfo>>,
}

/// Filters for GET /alerts
#[derive(Debug, Clone, Default)]
pub struct ListAlertsParams {
    pub alert_ids: Option<Vec<String>>,
    pub alert_types: Option<Vec<i64>>,
    pub alert_categories: Option<Vec<String>>,
    pub alert_states: Option<Vec<String>>,
    pub alert_severities: Option<Vec<String>>,
    pub alert_type_buckets: Option<Vec<String>>,
    pub start_time_usecs: Option<i64>,
    pub end_time_usecs: Option<i64>,
    pub max_alerts: Option<i64>,
    pub property_key: Option<String>,
    pub property_value: Option<String>,
    pub alert_name: Option<String>,
    pub resolution_ids: Option<Vec<i64>>,
    pub tenant_ids: Option<Vec<String>>,
    pub all_under_hierarchy: Option<bool>,
    /// Sent as a header rather than a query parameter
    pub scope_identifier: Option<String>,
}

impl ListAlertsParams {
    fn to_query(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add_list("alertIds", self.alert_ids.as_deref())
            .add_list("alertTypes", self.alert_types.as_deref())
            .add_list("alertCategories", self.alert_categories.as_deref())
            .add_list("alertStates", self.alert_states.as_deref())
            .add_list("alertSeverities", self.alert_severities.as_deref())
            .add_list("alertTypeBuckets", self.alert_type_buckets.as_deref())
            .add_optional("startTimeUsecs", self.start_time_usecs)
            .add_optional("endTimeUsecs", self.end_time_usecs)
            .add_optional("maxAlerts", self.max_alerts)
            .add_optional("propertyKey", self.property_key.as_deref())
            .add_optional("propertyValue", self.property_value.as_deref())
            .add_optional("alertName", self.alert_name.as_deref())
            .add_list("resolutionIds", self.resolution_ids.as_deref())
            .add_list("tenantIds", self.tenant_ids.as_deref())
            .add_optional("allUnderHierarchy", self.all_under_hierarchy)
    }
}

pub struct AlertsApi<'a> {
    client: &'a Client,
}

impl<'a> AlertsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /alerts
    pub async fn list(&self, params: &ListAlertsParams) -> Result<Vec<AlertInfo>, ApiError> {
        let options = RequestOptions {
            scope_identifier: params.scope_identifier.clone(),
            ..Default::default()
        };
        let response: Option<AlertList> = self
            .client
            .get_with_params("/alerts", &params.to_query(), &options)
            .await?;
        Ok(response.and_then(|r| r.alerts).unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::auth::BearerAuthenticator;
    use mockito::{Matcher, Server};
    use std::sync::Arc;

    #[tokio::test]
    async fn list_sends_filters_and_scope_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/alerts")
            .match_header("x-scope-identifier", "service-instance-id: abc")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("alertStates".into(), "kOpen,kNote".into()),
                Matcher::UrlEncoded("alertTypes".into(), "1007".into()),
                Matcher::UrlEncoded("maxAlerts".into(), "10".into()),
            ]))
            .with_body(
                r#"{"alerts":[{
                    "id":"a-1","alertCode":"CE00610007","alertState":"kOpen","alertType":1007,
                    "clusterId":8841,"severity":"kCritical","dedupCount":3,
                    "alertDocument":{"alertName":"BackupFailed","alertSummary":"backup failed"},
                    "propertyList":[{"key":"jobName","value":"daily"}]
                }]}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), Arc::new(BearerAuthenticator::new("tok"))).unwrap();
        let params = ListAlertsParams {
            alert_states: Some(vec!["kOpen".to_string(), "kNote".to_string()]),
            alert_types: Some(vec![1007]),
            max_alerts: Some(10),
            scope_identifier: Some("service-instance-id: abc".to_string()),
            ..Default::default()
        };
        let alerts = client.alerts().list(&params).await.unwrap();

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.cluster_id, Some(8841));
        assert_eq!(
            alert.alert_document.as_ref().and_then(|d| d.alert_name.as_deref()),
            Some("BackupFailed")
        );
        assert_eq!(alert.property_list.as_ref().unwrap()[0].key, "jobName");
        mock.assert_async().await;
    }
}

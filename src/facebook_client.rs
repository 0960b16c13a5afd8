use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::errors::FacebookError;
use crate::facebook_models::{
    ad_set_payload, campaign_create_payload, campaign_page_from_list, campaign_record_from_payload,
    campaign_update_payload, validation_result_from_account, AdAccountPayload, AdSetCreatePayload,
    CreatedObjectPayload, SuccessPayload, AD_ACCOUNT_FIELDS, CAMPAIGN_FIELDS,
};
use crate::graph_client::GraphClient;
use crate::models::{
    AdAccountId, AdSetOutcome, CampaignCreation, CampaignDeletion, CampaignDraft, CampaignPage,
    CampaignRecord, CampaignStatus, CampaignSyncStatus, CampaignUpdate, SyncState,
    ValidationResult,
};
use crate::rate_limiter::{ApiCallCost, RateBudget, RateLimiter};

/// Largest page size accepted by [`FacebookClient::list_campaigns`].
pub const MAX_PAGE_SIZE: u32 = 100;

/// Facebook Marketing API client.
///
/// One instance is meant to be shared by every caller in the process: clones
/// share the same rate-limit budget. Each operation runs
/// rate limiter → Graph API call → mapping, and returns failures unchanged.
/// Nothing is retried here.
#[derive(Clone)]
pub struct FacebookClient {
    graph: GraphClient,
    limiter: Arc<RateLimiter>,
}

impl FacebookClient {
    pub fn new(config: &Config) -> Result<Self, FacebookError> {
        let limiter = RateLimiter::new(
            config.rate_limit_points,
            Duration::from_secs(config.rate_limit_window_secs),
        );
        Ok(Self::from_parts(GraphClient::new(config)?, Arc::new(limiter)))
    }

    pub fn from_parts(graph: GraphClient, limiter: Arc<RateLimiter>) -> Self {
        Self { graph, limiter }
    }

    /// Current state of the local points budget.
    pub fn rate_limit_usage(&self) -> RateBudget {
        self.limiter.usage()
    }

    /// Admits the call through the rate limiter, then sends it.
    ///
    /// Points are returned when the request never reached the platform or the
    /// caller dropped the future before it completed.
    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, FacebookError> {
        let pending = self.limiter.admit(ApiCallCost::for_method(&method)).await?;

        match self.graph.send(method, endpoint, params, body).await {
            Err(
                e @ (FacebookError::TransportError { .. } | FacebookError::ValidationError { .. }),
            ) => {
                pending.refund();
                Err(e)
            }
            result => {
                pending.commit();
                result
            }
        }
    }

    /// Checks that an ad account exists and is ACTIVE.
    ///
    /// A missing account or a platform error is described in the returned
    /// [`ValidationResult`] rather than raised. Throttling and transport
    /// failures say nothing about the account and are propagated.
    pub async fn validate_ad_account(
        &self,
        ad_account_id: &str,
    ) -> Result<ValidationResult, FacebookError> {
        let account = match AdAccountId::new(ad_account_id) {
            Ok(account) => account,
            Err(e) => {
                return Ok(ValidationResult::failed(
                    ad_account_id.trim(),
                    format!("Validation failed: {}", e.user_message()),
                ))
            }
        };

        tracing::info!("Validating ad account: {}", account);

        let params = [("fields", AD_ACCOUNT_FIELDS.to_string())];
        match self.call(Method::GET, account.as_str(), &params, None).await {
            Ok(raw) => {
                let payload = AdAccountPayload::deserialize(&raw).unwrap_or_default();
                let result = validation_result_from_account(&account, &payload);
                tracing::info!("Ad account {} validation result: {}", account, result.is_valid);
                Ok(result)
            }
            Err(FacebookError::NotFound { .. }) => {
                tracing::warn!("Ad account {} not found", account);
                Ok(ValidationResult::not_found(account.as_str()))
            }
            Err(e @ FacebookError::ApiError { .. }) => {
                tracing::warn!("Ad account {} validation failed: {}", account, e);
                Ok(ValidationResult::failed(
                    account.as_str(),
                    format!("Validation failed: {}", e.user_message()),
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// Creates a PAUSED campaign under an existing ad account.
    ///
    /// With a frequency cap, a default ad set is created right after the
    /// campaign. If that second call fails the campaign stays in place and the
    /// failure is reported in [`CampaignCreation::ad_set`].
    pub async fn create_campaign(
        &self,
        draft: &CampaignDraft,
    ) -> Result<CampaignCreation, FacebookError> {
        draft.validate()?;
        let account = AdAccountId::new(&draft.ad_account_id)?;

        tracing::info!("Creating campaign '{}' in {}", draft.name.trim(), account);

        let body = serde_json::to_value(campaign_create_payload(draft))
            .map_err(|e| FacebookError::validation(format!("Invalid campaign payload: {}", e)))?;
        let raw = self
            .call(
                Method::POST,
                &format!("{}/campaigns", account),
                &[],
                Some(&body),
            )
            .await?;

        let created = CreatedObjectPayload::deserialize(&raw).map_err(|_| {
            tracing::warn!("Unexpected campaign creation response: {:?}", raw);
            FacebookError::ApiError {
                code: None,
                message: "Campaign creation response missing 'id' field".to_string(),
                http_status: None,
            }
        })?;

        tracing::info!("✓ Campaign created: {}", created.id);

        let ad_set = match &draft.frequency_cap {
            Some(cap) => {
                let payload =
                    ad_set_payload(&created.id, cap, draft.budget_type, draft.budget_amount);
                Some(self.create_ad_set(&account, &created.id, &payload).await)
            }
            None => None,
        };

        Ok(CampaignCreation {
            campaign_id: created.id,
            ad_account_id: account.to_string(),
            ad_set,
            facebook_data: raw,
        })
    }

    async fn create_ad_set(
        &self,
        account: &AdAccountId,
        campaign_id: &str,
        payload: &AdSetCreatePayload,
    ) -> AdSetOutcome {
        let result = match serde_json::to_value(payload) {
            Ok(body) => {
                self.call(
                    Method::POST,
                    &format!("{}/adsets", account),
                    &[],
                    Some(&body),
                )
                .await
            }
            Err(e) => Err(FacebookError::validation(format!(
                "Invalid ad set payload: {}",
                e
            ))),
        };

        let outcome = result.and_then(|raw| {
            CreatedObjectPayload::deserialize(&raw).map_err(|_| FacebookError::ApiError {
                code: None,
                message: "Ad set creation response missing 'id' field".to_string(),
                http_status: None,
            })
        });

        match outcome {
            Ok(created) => {
                tracing::info!(
                    "✓ Frequency-capped ad set {} created for campaign {}",
                    created.id,
                    campaign_id
                );
                AdSetOutcome::Created {
                    ad_set_id: created.id,
                }
            }
            Err(error) => {
                tracing::warn!(
                    "⚠️  Campaign {} created but its ad set failed: {}",
                    campaign_id,
                    error
                );
                AdSetOutcome::Failed { error }
            }
        }
    }

    pub async fn get_campaign(&self, campaign_id: &str) -> Result<CampaignRecord, FacebookError> {
        let campaign_id = campaign_endpoint(campaign_id)?;
        let params = [("fields", CAMPAIGN_FIELDS.to_string())];
        let raw = self.call(Method::GET, campaign_id, &params, None).await?;
        Ok(campaign_record_from_payload(raw, None))
    }

    /// Applies a partial update, then reads the campaign back.
    ///
    /// The read-back is a separate call: when it fails the update has already
    /// been applied, yet its error is what the caller sees. Check with
    /// [`FacebookClient::get_campaign`] before retrying the update.
    pub async fn update_campaign(
        &self,
        campaign_id: &str,
        update: &CampaignUpdate,
    ) -> Result<CampaignRecord, FacebookError> {
        let campaign_id = campaign_endpoint(campaign_id)?;
        update.validate()?;

        let body = serde_json::to_value(campaign_update_payload(update))
            .map_err(|e| FacebookError::validation(format!("Invalid update payload: {}", e)))?;
        self.call(Method::POST, campaign_id, &[], Some(&body)).await?;

        tracing::info!("Campaign updated successfully: {}", campaign_id);
        self.get_campaign(campaign_id).await
    }

    /// Marks a campaign DELETED. The platform does not allow hard deletes, so
    /// this is a status update and never an HTTP DELETE.
    pub async fn delete_campaign(
        &self,
        campaign_id: &str,
    ) -> Result<CampaignDeletion, FacebookError> {
        let campaign_id = campaign_endpoint(campaign_id)?;
        let body = json!({ "status": CampaignStatus::Deleted.as_str() });
        let raw = self
            .call(Method::POST, campaign_id, &[], Some(&body))
            .await?;

        let success = SuccessPayload::deserialize(&raw)
            .map(|s| s.success)
            .unwrap_or(false);
        tracing::info!("Campaign {} marked DELETED (success={})", campaign_id, success);

        Ok(CampaignDeletion {
            campaign_id: campaign_id.to_string(),
            success,
        })
    }

    /// Lists the first page of campaigns of an ad account.
    pub async fn list_campaigns(
        &self,
        ad_account_id: &str,
        limit: u32,
    ) -> Result<CampaignPage, FacebookError> {
        self.list_campaigns_page(ad_account_id, limit, None).await
    }

    /// Lists campaigns starting after a paging cursor from a previous page.
    pub async fn list_campaigns_page(
        &self,
        ad_account_id: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<CampaignPage, FacebookError> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(FacebookError::validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        let account = AdAccountId::new(ad_account_id)?;

        let mut params = vec![
            ("fields", CAMPAIGN_FIELDS.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(cursor) = after {
            params.push(("after", cursor.to_string()));
        }

        let raw = self
            .call(
                Method::GET,
                &format!("{}/campaigns", account),
                &params,
                None,
            )
            .await?;

        let page = campaign_page_from_list(raw, &account);
        tracing::info!("Listed {} campaigns for {}", page.campaigns.len(), account);
        Ok(page)
    }

    /// Reports whether a campaign is still present on the platform.
    ///
    /// Like validation, a missing campaign or platform error becomes part of
    /// the returned status.
    pub async fn campaign_sync_status(
        &self,
        campaign_id: &str,
    ) -> Result<CampaignSyncStatus, FacebookError> {
        let campaign_id = campaign_id.trim();
        let now = chrono::Utc::now();
        match self.get_campaign(campaign_id).await {
            Ok(record) => Ok(CampaignSyncStatus {
                campaign_id: campaign_id.to_string(),
                facebook_campaign_id: record
                    .facebook_campaign_id
                    .or_else(|| Some(campaign_id.to_string())),
                sync_status: SyncState::Synced,
                last_sync_at: now,
                facebook_status: Some(record.status.as_str().to_string()),
                sync_errors: Vec::new(),
            }),
            Err(FacebookError::NotFound { .. }) => Ok(CampaignSyncStatus {
                campaign_id: campaign_id.to_string(),
                facebook_campaign_id: None,
                sync_status: SyncState::NotFound,
                last_sync_at: now,
                facebook_status: None,
                sync_errors: vec!["Campaign not found in Facebook".to_string()],
            }),
            Err(e @ FacebookError::ApiError { .. }) => Ok(CampaignSyncStatus {
                campaign_id: campaign_id.to_string(),
                facebook_campaign_id: None,
                sync_status: SyncState::Error,
                last_sync_at: now,
                facebook_status: None,
                sync_errors: vec![format!("Sync error: {}", e.user_message())],
            }),
            Err(e) => Err(e),
        }
    }
}

/// Campaign ids are used as path segments; reject anything that is not one.
fn campaign_endpoint(campaign_id: &str) -> Result<&str, FacebookError> {
    let trimmed = campaign_id.trim();
    if trimmed.is_empty() {
        return Err(FacebookError::validation("Campaign ID cannot be empty"));
    }
    if trimmed.contains(['/', '?', '#', '&']) {
        return Err(FacebookError::validation(format!(
            "Invalid campaign ID: {}",
            trimmed
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_endpoint() {
        assert_eq!(campaign_endpoint(" 120 ").unwrap(), "120");
        assert!(campaign_endpoint("").is_err());
        assert!(campaign_endpoint("120/adsets").is_err());
        assert!(campaign_endpoint("120?fields=x").is_err());
    }

    #[tokio::test]
    async fn test_list_limit_checked_before_network() {
        let client = FacebookClient::new(&Config::new("http://127.0.0.1:9", "token")).unwrap();
        let err = client.list_campaigns("123", 0).await.unwrap_err();
        assert!(matches!(err, FacebookError::ValidationError { .. }));
        let err = client.list_campaigns("123", 101).await.unwrap_err();
        assert!(matches!(err, FacebookError::ValidationError { .. }));
        assert_eq!(client.rate_limit_usage().points_used, 0);
    }

    #[tokio::test]
    async fn test_transport_failure_hides_access_token() {
        let client =
            FacebookClient::new(&Config::new("http://127.0.0.1:9", "SECRET_TOKEN_XYZ")).unwrap();
        let err = client.get_campaign("120").await.unwrap_err();

        assert!(matches!(err, FacebookError::TransportError { .. }));
        assert!(!err.to_string().contains("SECRET_TOKEN_XYZ"));
        let message = err.user_message();
        assert!(!message.contains("SECRET_TOKEN_XYZ"));
        assert!(!message.contains("Request failed: Request failed"));
    }

    #[tokio::test]
    async fn test_transport_failure_refunds_points() {
        // Port 9 (discard) is closed on test hosts, so the connection is refused.
        let client = FacebookClient::new(&Config::new("http://127.0.0.1:9", "token")).unwrap();
        let err = client.get_campaign("120").await.unwrap_err();
        assert!(matches!(err, FacebookError::TransportError { .. }));
        assert_eq!(client.rate_limit_usage().points_used, 0);
    }
}

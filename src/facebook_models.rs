use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{
    normalize_ad_account_id, AdAccountId, BudgetType, CampaignDraft, CampaignObjective,
    CampaignPage, CampaignRecord, CampaignStatus, CampaignUpdate, FrequencyCap, SyncState,
    ValidationResult,
};

/// `account_status` value the platform uses for ACTIVE accounts.
pub const ACCOUNT_STATUS_ACTIVE: i64 = 1;

/// Fields requested when validating an ad account.
pub const AD_ACCOUNT_FIELDS: &str = "name,account_status,currency,timezone_name,account_id";

/// Fields requested when reading or listing campaigns.
pub const CAMPAIGN_FIELDS: &str = "id,account_id,name,objective,status,start_time,stop_time,daily_budget,lifetime_budget,created_time,updated_time";

/// Targeting applied to the default ad set.
const DEFAULT_COUNTRIES: &[&str] = &["US"];
const DEFAULT_AGE_MIN: u8 = 18;
const DEFAULT_AGE_MAX: u8 = 65;

/// Permissions reported for accounts the token can read.
const DEFAULT_PERMISSIONS: &[&str] = &["MANAGE_CAMPAIGNS"];

// Graph fields are read one by one: a value of the wrong type becomes `None`
// instead of failing the whole object.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

// Ids are strings, but some edges return them as bare numbers.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    })
}

// Budgets arrive as strings ("500") but numbers are accepted too.
fn deserialize_budget<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Ad account object as returned by `GET /act_<id>`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AdAccountPayload {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub account_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub account_status: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub timezone_name: Option<String>,
}

/// Campaign object as returned by the Graph API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CampaignPayload {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub account_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub objective: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub stop_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_budget")]
    pub daily_budget: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_budget")]
    pub lifetime_budget: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub updated_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Cursors {
    #[serde(default, deserialize_with = "lenient")]
    pub before: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub after: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Paging {
    #[serde(default, deserialize_with = "lenient")]
    pub cursors: Option<Cursors>,
    #[serde(default, deserialize_with = "lenient")]
    pub next: Option<String>,
}

/// Edge listing such as `GET /act_<id>/campaigns`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CampaignListPayload {
    #[serde(default, deserialize_with = "lenient_list")]
    pub data: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub paging: Option<Paging>,
}

/// `{"id": "..."}` returned by create calls.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedObjectPayload {
    pub id: String,
}

/// `{"success": true}` returned by update calls.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SuccessPayload {
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignCreatePayload {
    pub name: String,
    pub objective: CampaignObjective,
    pub status: CampaignStatus,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifetime_budget: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoLocations {
    pub countries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Targeting {
    pub geo_locations: GeoLocations,
    pub age_min: u8,
    pub age_max: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyControlSpec {
    pub event: String,
    pub interval_days: u16,
    pub max_frequency: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdSetCreatePayload {
    pub name: String,
    pub campaign_id: String,
    pub status: CampaignStatus,
    pub targeting: Targeting,
    pub frequency_control_specs: Vec<FrequencyControlSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifetime_budget: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignUpdatePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifetime_budget: Option<i64>,
}

/// Parses a platform timestamp.
///
/// Accepts RFC 3339 (`2025-03-01T00:00:00Z`) and the Graph API's compact
/// offset form (`2025-03-01T00:00:00+0000`).
pub fn parse_platform_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| tracing::debug!("Unparseable platform timestamp '{}': {}", raw, e))
        .ok()
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn split_budget(budget_type: BudgetType, amount: i64) -> (Option<i64>, Option<i64>) {
    match budget_type {
        BudgetType::Daily => (Some(amount), None),
        BudgetType::Lifetime => (None, Some(amount)),
    }
}

/// Maps an ad account payload to a validation result.
///
/// Only `account_status == 1` counts as valid; anything else, including a
/// missing status, is reported as INACTIVE.
pub fn validation_result_from_account(
    ad_account_id: &AdAccountId,
    payload: &AdAccountPayload,
) -> ValidationResult {
    let is_active = payload.account_status == Some(ACCOUNT_STATUS_ACTIVE);

    let errors = if is_active {
        Vec::new()
    } else {
        vec![match payload.account_status {
            Some(status) => format!(
                "Ad account {} is not active (account_status={})",
                ad_account_id, status
            ),
            None => format!("Ad account {} did not report a status", ad_account_id),
        }]
    };

    ValidationResult {
        ad_account_id: ad_account_id.to_string(),
        exists: true,
        is_valid: is_active,
        account_name: payload.name.clone(),
        currency: payload.currency.clone(),
        timezone: payload.timezone_name.clone(),
        status: Some(if is_active { "ACTIVE" } else { "INACTIVE" }.to_string()),
        permissions: DEFAULT_PERMISSIONS.iter().map(|p| p.to_string()).collect(),
        errors,
    }
}

/// Maps a raw campaign object to a [`CampaignRecord`], keeping the raw payload.
///
/// Total: fields that are missing or malformed map to their absent/default value.
pub fn campaign_record_from_payload(
    raw: Value,
    ad_account_id: Option<&AdAccountId>,
) -> CampaignRecord {
    let payload = CampaignPayload::deserialize(&raw).unwrap_or_else(|e| {
        tracing::warn!("Unexpected campaign payload shape: {}", e);
        CampaignPayload::default()
    });

    let (budget_type, budget_amount) = match (payload.daily_budget, payload.lifetime_budget) {
        (Some(amount), _) => (BudgetType::Daily, amount),
        (None, Some(amount)) => (BudgetType::Lifetime, amount),
        (None, None) => (BudgetType::Lifetime, 0),
    };

    let ad_account_id = ad_account_id
        .map(|id| id.to_string())
        .or_else(|| payload.account_id.as_deref().map(normalize_ad_account_id));

    CampaignRecord {
        id: Uuid::new_v4(),
        facebook_campaign_id: payload.id,
        name: payload.name.unwrap_or_default(),
        objective: payload
            .objective
            .as_deref()
            .and_then(CampaignObjective::from_platform),
        status: payload
            .status
            .as_deref()
            .map(CampaignStatus::from_platform)
            .unwrap_or(CampaignStatus::Paused),
        start_time: payload.start_time.as_deref().and_then(parse_platform_timestamp),
        stop_time: payload.stop_time.as_deref().and_then(parse_platform_timestamp),
        budget_type,
        budget_amount,
        ad_account_id,
        created_at: payload.created_time.as_deref().and_then(parse_platform_timestamp),
        updated_at: payload.updated_time.as_deref().and_then(parse_platform_timestamp),
        sync_status: SyncState::Synced,
        last_sync_at: Utc::now(),
        facebook_data: raw,
    }
}

/// Maps a campaign listing to a page of records.
pub fn campaign_page_from_list(raw: Value, ad_account_id: &AdAccountId) -> CampaignPage {
    let listing = CampaignListPayload::deserialize(&raw).unwrap_or_else(|e| {
        tracing::warn!("Unexpected campaign list shape: {}", e);
        CampaignListPayload::default()
    });

    let paging = listing.paging.unwrap_or_default();
    let next_cursor = paging.cursors.and_then(|c| c.after);
    let has_next = paging.next.is_some();

    CampaignPage {
        campaigns: listing
            .data
            .into_iter()
            .map(|item| campaign_record_from_payload(item, Some(ad_account_id)))
            .collect(),
        has_next,
        next_cursor: if has_next { next_cursor } else { None },
    }
}

/// Builds the campaign creation body. Campaigns are always created PAUSED.
pub fn campaign_create_payload(draft: &CampaignDraft) -> CampaignCreatePayload {
    let (daily_budget, lifetime_budget) = split_budget(draft.budget_type, draft.budget_amount);

    CampaignCreatePayload {
        name: draft.name.trim().to_string(),
        objective: draft.objective,
        status: CampaignStatus::Paused,
        start_time: format_timestamp(&draft.start_time),
        daily_budget,
        lifetime_budget,
        stop_time: draft.stop_time.as_ref().map(format_timestamp),
    }
}

/// Builds the default ad set carrying a campaign's frequency cap.
pub fn ad_set_payload(
    campaign_id: &str,
    frequency_cap: &FrequencyCap,
    budget_type: BudgetType,
    budget_amount: i64,
) -> AdSetCreatePayload {
    let (daily_budget, lifetime_budget) = split_budget(budget_type, budget_amount);

    AdSetCreatePayload {
        name: format!("Default AdSet for Campaign {}", campaign_id),
        campaign_id: campaign_id.to_string(),
        status: CampaignStatus::Paused,
        targeting: Targeting {
            geo_locations: GeoLocations {
                countries: DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect(),
            },
            age_min: DEFAULT_AGE_MIN,
            age_max: DEFAULT_AGE_MAX,
        },
        frequency_control_specs: vec![FrequencyControlSpec {
            event: frequency_cap.event.clone(),
            interval_days: frequency_cap.interval_days,
            max_frequency: frequency_cap.max_frequency,
        }],
        daily_budget,
        lifetime_budget,
    }
}

/// Builds a partial update body; budget is included only with both type and amount.
pub fn campaign_update_payload(update: &CampaignUpdate) -> CampaignUpdatePayload {
    let (daily_budget, lifetime_budget) = match (update.budget_type, update.budget_amount) {
        (Some(budget_type), Some(amount)) => split_budget(budget_type, amount),
        _ => (None, None),
    };

    CampaignUpdatePayload {
        name: update.name.as_ref().map(|n| n.trim().to_string()),
        status: update.status,
        start_time: update.start_time.as_ref().map(format_timestamp),
        stop_time: update.stop_time.as_ref().map(format_timestamp),
        daily_budget,
        lifetime_budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn account() -> AdAccountId {
        AdAccountId::new("123").unwrap()
    }

    #[test]
    fn test_active_account_is_valid() {
        let payload: AdAccountPayload =
            serde_json::from_value(json!({"account_status": 1, "name": "Acme", "currency": "USD"}))
                .unwrap();
        let result = validation_result_from_account(&account(), &payload);

        assert!(result.exists);
        assert!(result.is_valid);
        assert_eq!(result.status.as_deref(), Some("ACTIVE"));
        assert_eq!(result.account_name.as_deref(), Some("Acme"));
        assert_eq!(result.currency.as_deref(), Some("USD"));
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_inactive_account_is_invalid() {
        let payload: AdAccountPayload =
            serde_json::from_value(json!({"account_status": 2})).unwrap();
        let result = validation_result_from_account(&account(), &payload);
        assert!(!result.is_valid);
        assert_eq!(result.status.as_deref(), Some("INACTIVE"));

        let result = validation_result_from_account(&account(), &AdAccountPayload::default());
        assert!(!result.is_valid);
        assert_eq!(result.status.as_deref(), Some("INACTIVE"));
    }

    #[test]
    fn test_mistyped_account_field_keeps_the_rest() {
        let payload: AdAccountPayload = serde_json::from_value(json!({
            "account_status": 1,
            "name": "Acme",
            "currency": "USD",
            "timezone_name": {"unexpected": true}
        }))
        .unwrap();
        let result = validation_result_from_account(&account(), &payload);

        assert!(result.is_valid);
        assert_eq!(result.status.as_deref(), Some("ACTIVE"));
        assert_eq!(result.account_name.as_deref(), Some("Acme"));
        assert_eq!(result.timezone, None);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_numeric_ids_are_read_as_strings() {
        let payload: AdAccountPayload =
            serde_json::from_value(json!({"account_status": 1, "account_id": 123})).unwrap();
        assert_eq!(payload.account_id.as_deref(), Some("123"));

        let record = campaign_record_from_payload(
            json!({"id": "120", "name": "Launch", "daily_budget": "500", "account_id": 987}),
            None,
        );
        assert_eq!(record.facebook_campaign_id.as_deref(), Some("120"));
        assert_eq!(record.name, "Launch");
        assert_eq!(record.budget_type, BudgetType::Daily);
        assert_eq!(record.budget_amount, 500);
        assert_eq!(record.ad_account_id.as_deref(), Some("act_987"));
    }

    #[test]
    fn test_mistyped_campaign_field_keeps_the_rest() {
        let record = campaign_record_from_payload(
            json!({"id": "120", "name": ["Launch"], "status": "ACTIVE", "lifetime_budget": 900}),
            None,
        );
        assert_eq!(record.facebook_campaign_id.as_deref(), Some("120"));
        assert_eq!(record.name, "");
        assert_eq!(record.status, CampaignStatus::Active);
        assert_eq!(record.budget_type, BudgetType::Lifetime);
        assert_eq!(record.budget_amount, 900);
    }

    #[test]
    fn test_malformed_paging_keeps_listed_campaigns() {
        let page = campaign_page_from_list(
            json!({"data": [{"id": "1"}, {"id": "2"}], "paging": "bogus"}),
            &account(),
        );
        assert_eq!(page.campaigns.len(), 2);
        assert!(!page.has_next);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn test_daily_budget_inferred() {
        let record = campaign_record_from_payload(json!({"daily_budget": "500"}), None);
        assert_eq!(record.budget_type, BudgetType::Daily);
        assert_eq!(record.budget_amount, 500);
    }

    #[test]
    fn test_lifetime_and_missing_budget() {
        let record = campaign_record_from_payload(json!({"lifetime_budget": 12000}), None);
        assert_eq!(record.budget_type, BudgetType::Lifetime);
        assert_eq!(record.budget_amount, 12000);

        let record = campaign_record_from_payload(json!({"daily_budget": ""}), None);
        assert_eq!(record.budget_type, BudgetType::Lifetime);
        assert_eq!(record.budget_amount, 0);
    }

    #[test]
    fn test_campaign_record_fields() {
        let raw = json!({
            "id": "120200000001",
            "account_id": "987",
            "name": "Launch",
            "objective": "OUTCOME_LEADS",
            "status": "ACTIVE",
            "start_time": "2025-03-01T00:00:00Z",
            "created_time": "2025-02-20T10:30:00+0000",
            "updated_time": "not a date"
        });
        let record = campaign_record_from_payload(raw.clone(), None);

        assert_eq!(record.facebook_campaign_id.as_deref(), Some("120200000001"));
        assert_eq!(record.objective, Some(CampaignObjective::OutcomeLeads));
        assert_eq!(record.status, CampaignStatus::Active);
        assert_eq!(
            record.start_time,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(record.stop_time, None);
        assert_eq!(
            record.created_at,
            Some(Utc.with_ymd_and_hms(2025, 2, 20, 10, 30, 0).unwrap())
        );
        assert_eq!(record.updated_at, None);
        assert_eq!(record.ad_account_id.as_deref(), Some("act_987"));
        assert_eq!(record.facebook_data, raw);
    }

    #[test]
    fn test_campaign_page_paging() {
        let raw = json!({
            "data": [{"id": "1", "name": "A"}, {"id": "2", "name": "B"}],
            "paging": {
                "cursors": {"before": "b", "after": "a"},
                "next": "https://graph.facebook.com/next"
            }
        });
        let page = campaign_page_from_list(raw, &account());
        assert_eq!(page.campaigns.len(), 2);
        assert!(page.has_next);
        assert_eq!(page.next_cursor.as_deref(), Some("a"));
        assert_eq!(page.campaigns[0].ad_account_id.as_deref(), Some("act_123"));

        let page = campaign_page_from_list(json!({"data": []}), &account());
        assert!(page.campaigns.is_empty());
        assert!(!page.has_next);
    }

    #[test]
    fn test_create_payload_is_paused() {
        let draft = CampaignDraft {
            name: "  Summer  ".to_string(),
            objective: CampaignObjective::OutcomeTraffic,
            start_time: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            stop_time: Some(Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap()),
            budget_type: BudgetType::Lifetime,
            budget_amount: 90000,
            ad_account_id: "123".to_string(),
            frequency_cap: None,
        };

        let body = serde_json::to_value(campaign_create_payload(&draft)).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "Summer",
                "objective": "OUTCOME_TRAFFIC",
                "status": "PAUSED",
                "start_time": "2025-06-01T00:00:00Z",
                "lifetime_budget": 90000,
                "stop_time": "2025-06-30T00:00:00Z"
            })
        );
    }

    #[test]
    fn test_ad_set_payload() {
        let body = serde_json::to_value(ad_set_payload(
            "555",
            &FrequencyCap::new(7, 2),
            BudgetType::Daily,
            1000,
        ))
        .unwrap();

        assert_eq!(body["campaign_id"], "555");
        assert_eq!(body["status"], "PAUSED");
        assert_eq!(body["daily_budget"], 1000);
        assert_eq!(body["targeting"]["age_min"], 18);
        assert_eq!(body["targeting"]["age_max"], 65);
        assert_eq!(body["targeting"]["geo_locations"]["countries"], json!(["US"]));
        assert_eq!(
            body["frequency_control_specs"],
            json!([{"event": "IMPRESSIONS", "interval_days": 7, "max_frequency": 2}])
        );
    }

    #[test]
    fn test_update_payload_only_sends_changes() {
        let update = CampaignUpdate {
            name: Some("Renamed".to_string()),
            budget_amount: Some(700),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(campaign_update_payload(&update)).unwrap(),
            json!({"name": "Renamed"})
        );

        let update = CampaignUpdate {
            budget_type: Some(BudgetType::Daily),
            budget_amount: Some(700),
            status: Some(CampaignStatus::Active),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(campaign_update_payload(&update)).unwrap(),
            json!({"status": "ACTIVE", "daily_budget": 700})
        );
    }
}

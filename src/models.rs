use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::errors::FacebookError;

/// Prefix the Graph API requires on ad account identifiers.
pub const AD_ACCOUNT_PREFIX: &str = "act_";

const MAX_CAMPAIGN_NAME_LEN: usize = 400;

/// Adds the `act_` prefix when missing. Applying it twice changes nothing.
pub fn normalize_ad_account_id(raw: &str) -> String {
    if raw.starts_with(AD_ACCOUNT_PREFIX) {
        raw.to_string()
    } else {
        format!("{}{}", AD_ACCOUNT_PREFIX, raw)
    }
}

/// Normalized ad account identifier (`act_<digits>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AdAccountId(String);

impl AdAccountId {
    pub fn new(raw: &str) -> Result<Self, FacebookError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == AD_ACCOUNT_PREFIX {
            return Err(FacebookError::validation("Ad account ID cannot be empty"));
        }
        Ok(Self(normalize_ad_account_id(trimmed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier without its `act_` prefix.
    pub fn numeric_id(&self) -> &str {
        self.0.strip_prefix(AD_ACCOUNT_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for AdAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AdAccountId {
    type Error = FacebookError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AdAccountId::new(&value)
    }
}

impl From<AdAccountId> for String {
    fn from(id: AdAccountId) -> Self {
        id.0
    }
}

/// Campaign objectives accepted by the Marketing API (ODAX set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignObjective {
    OutcomeAwareness,
    OutcomeTraffic,
    OutcomeEngagement,
    OutcomeLeads,
    OutcomeAppPromotion,
    OutcomeSales,
}

impl CampaignObjective {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignObjective::OutcomeAwareness => "OUTCOME_AWARENESS",
            CampaignObjective::OutcomeTraffic => "OUTCOME_TRAFFIC",
            CampaignObjective::OutcomeEngagement => "OUTCOME_ENGAGEMENT",
            CampaignObjective::OutcomeLeads => "OUTCOME_LEADS",
            CampaignObjective::OutcomeAppPromotion => "OUTCOME_APP_PROMOTION",
            CampaignObjective::OutcomeSales => "OUTCOME_SALES",
        }
    }

    /// Parses a platform value; legacy objectives yield `None`.
    pub fn from_platform(value: &str) -> Option<Self> {
        match value {
            "OUTCOME_AWARENESS" => Some(CampaignObjective::OutcomeAwareness),
            "OUTCOME_TRAFFIC" => Some(CampaignObjective::OutcomeTraffic),
            "OUTCOME_ENGAGEMENT" => Some(CampaignObjective::OutcomeEngagement),
            "OUTCOME_LEADS" => Some(CampaignObjective::OutcomeLeads),
            "OUTCOME_APP_PROMOTION" => Some(CampaignObjective::OutcomeAppPromotion),
            "OUTCOME_SALES" => Some(CampaignObjective::OutcomeSales),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Active,
    Paused,
    Deleted,
    Archived,
    /// Any status this client does not model (e.g. `IN_PROCESS`).
    #[serde(other)]
    Unknown,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "ACTIVE",
            CampaignStatus::Paused => "PAUSED",
            CampaignStatus::Deleted => "DELETED",
            CampaignStatus::Archived => "ARCHIVED",
            CampaignStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn from_platform(value: &str) -> Self {
        match value {
            "ACTIVE" => CampaignStatus::Active,
            "PAUSED" => CampaignStatus::Paused,
            "DELETED" => CampaignStatus::Deleted,
            "ARCHIVED" => CampaignStatus::Archived,
            _ => CampaignStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BudgetType {
    #[default]
    #[serde(rename = "daily_budget", alias = "daily")]
    Daily,
    #[serde(rename = "lifetime_budget", alias = "lifetime")]
    Lifetime,
}

impl BudgetType {
    /// Graph API field carrying this budget.
    pub fn field_name(&self) -> &'static str {
        match self {
            BudgetType::Daily => "daily_budget",
            BudgetType::Lifetime => "lifetime_budget",
        }
    }
}

fn default_frequency_event() -> String {
    "IMPRESSIONS".to_string()
}

/// Frequency control attached to the default ad set of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyCap {
    #[serde(default = "default_frequency_event")]
    pub event: String,
    /// 1..=90
    pub interval_days: u16,
    /// 1..=100
    pub max_frequency: u16,
}

impl FrequencyCap {
    pub fn new(interval_days: u16, max_frequency: u16) -> Self {
        Self {
            event: default_frequency_event(),
            interval_days,
            max_frequency,
        }
    }

    pub fn validate(&self) -> Result<(), FacebookError> {
        if self.event.trim().is_empty() {
            return Err(FacebookError::validation(
                "Frequency cap event cannot be empty",
            ));
        }
        if !(1..=90).contains(&self.interval_days) {
            return Err(FacebookError::validation(
                "Frequency cap interval_days must be between 1 and 90",
            ));
        }
        if !(1..=100).contains(&self.max_frequency) {
            return Err(FacebookError::validation(
                "Frequency cap max_frequency must be between 1 and 100",
            ));
        }
        Ok(())
    }
}

fn validate_schedule(
    start_time: Option<&DateTime<Utc>>,
    stop_time: Option<&DateTime<Utc>>,
) -> Result<(), FacebookError> {
    if let (Some(start), Some(stop)) = (start_time, stop_time) {
        if stop <= start {
            return Err(FacebookError::validation(
                "Stop time must be after start time",
            ));
        }
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), FacebookError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FacebookError::validation("Campaign name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_CAMPAIGN_NAME_LEN {
        return Err(FacebookError::validation(format!(
            "Campaign name cannot exceed {} characters",
            MAX_CAMPAIGN_NAME_LEN
        )));
    }
    Ok(())
}

/// Caller intent to create a campaign, checked by [`CampaignDraft::validate`]
/// before anything is sent to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDraft {
    pub name: String,
    pub objective: CampaignObjective,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub stop_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub budget_type: BudgetType,
    /// Budget in the account currency's minor unit (cents).
    pub budget_amount: i64,
    pub ad_account_id: String,
    #[serde(default)]
    pub frequency_cap: Option<FrequencyCap>,
}

impl CampaignDraft {
    pub fn validate(&self) -> Result<(), FacebookError> {
        validate_name(&self.name)?;
        if self.budget_amount <= 0 {
            return Err(FacebookError::validation(
                "Budget amount must be greater than zero",
            ));
        }
        validate_schedule(Some(&self.start_time), self.stop_time.as_ref())?;
        if let Some(cap) = &self.frequency_cap {
            cap.validate()?;
        }
        AdAccountId::new(&self.ad_account_id)?;
        Ok(())
    }
}

/// Partial campaign update. Budget changes need both type and amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<CampaignStatus>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stop_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub budget_type: Option<BudgetType>,
    #[serde(default)]
    pub budget_amount: Option<i64>,
}

impl CampaignUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.status.is_none()
            && self.start_time.is_none()
            && self.stop_time.is_none()
            && (self.budget_type.is_none() || self.budget_amount.is_none())
    }

    pub fn validate(&self) -> Result<(), FacebookError> {
        if self.is_empty() {
            return Err(FacebookError::validation("Update contains no changes"));
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if self.status == Some(CampaignStatus::Unknown) {
            return Err(FacebookError::validation("Unsupported campaign status"));
        }
        if let Some(amount) = self.budget_amount {
            if amount <= 0 {
                return Err(FacebookError::validation(
                    "Budget amount must be greater than zero",
                ));
            }
        }
        validate_schedule(self.start_time.as_ref(), self.stop_time.as_ref())
    }
}

/// Outcome of checking an ad account. Never an error: failures are described
/// in `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ad_account_id: String,
    pub exists: bool,
    pub is_valid: bool,
    pub account_name: Option<String>,
    pub currency: Option<String>,
    pub timezone: Option<String>,
    pub status: Option<String>,
    pub permissions: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn not_found(ad_account_id: &str) -> Self {
        Self::failed(
            ad_account_id,
            format!("Ad account {} not found", ad_account_id),
        )
    }

    pub fn failed(ad_account_id: &str, error: impl Into<String>) -> Self {
        Self {
            ad_account_id: ad_account_id.to_string(),
            exists: false,
            is_valid: false,
            account_name: None,
            currency: None,
            timezone: None,
            status: None,
            permissions: Vec::new(),
            errors: vec![error.into()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Synced,
    NotFound,
    Error,
}

/// Campaign as read back from the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    /// Internal identifier assigned when the record is mapped.
    pub id: Uuid,
    pub facebook_campaign_id: Option<String>,
    pub name: String,
    /// `None` for legacy objectives outside the OUTCOME_* set.
    pub objective: Option<CampaignObjective>,
    pub status: CampaignStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
    pub budget_type: BudgetType,
    pub budget_amount: i64,
    pub ad_account_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub sync_status: SyncState,
    pub last_sync_at: DateTime<Utc>,
    /// Raw platform payload, kept for diagnostics.
    pub facebook_data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignPage {
    pub campaigns: Vec<CampaignRecord>,
    pub has_next: bool,
    pub next_cursor: Option<String>,
}

/// Result of the secondary ad set call made for frequency-capped campaigns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdSetOutcome {
    Created { ad_set_id: String },
    /// The campaign exists but its ad set could not be created.
    Failed { error: FacebookError },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignCreation {
    pub campaign_id: String,
    pub ad_account_id: String,
    /// `None` when the draft had no frequency cap.
    pub ad_set: Option<AdSetOutcome>,
    pub facebook_data: Value,
}

impl CampaignCreation {
    /// Failure of the ad set step, if any.
    pub fn ad_set_error(&self) -> Option<&FacebookError> {
        match &self.ad_set {
            Some(AdSetOutcome::Failed { error }) => Some(error),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.ad_set_error().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDeletion {
    pub campaign_id: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSyncStatus {
    pub campaign_id: String,
    pub facebook_campaign_id: Option<String>,
    pub sync_status: SyncState,
    pub last_sync_at: DateTime<Utc>,
    pub facebook_status: Option<String>,
    pub sync_errors: Vec<String>,
}

pub const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_API_VERSION: &str = "v18.0";
pub const DEFAULT_RATE_LIMIT_POINTS: u32 = 9000;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub api_version: String,
    pub access_token: String,
    pub rate_limit_points: u32,
    pub rate_limit_window_secs: u64,
    pub request_timeout_secs: u64,
}

impl Config {
    /// Builds a config with default API version, budget and timeout.
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            access_token: access_token.into(),
            rate_limit_points: DEFAULT_RATE_LIMIT_POINTS,
            rate_limit_window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            base_url: std::env::var("FACEBOOK_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
                .trim()
                .trim_end_matches('/')
                .to_string(),
            api_version: std::env::var("FACEBOOK_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string())
                .trim()
                .to_string(),
            access_token: std::env::var("FACEBOOK_ACCESS_TOKEN")
                .map_err(|_| anyhow::anyhow!("FACEBOOK_ACCESS_TOKEN environment variable required"))
                .and_then(|token| {
                    if token.trim().is_empty() {
                        anyhow::bail!("FACEBOOK_ACCESS_TOKEN cannot be empty");
                    }
                    Ok(token)
                })?,
            rate_limit_points: parse_positive("FACEBOOK_RATE_LIMIT_POINTS", DEFAULT_RATE_LIMIT_POINTS)?,
            rate_limit_window_secs: parse_positive(
                "FACEBOOK_RATE_LIMIT_WINDOW",
                DEFAULT_RATE_LIMIT_WINDOW_SECS,
            )?,
            request_timeout_secs: parse_positive(
                "FACEBOOK_REQUEST_TIMEOUT",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
        };

        config.validate()?;

        // Log successful configuration load (without the access token)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Facebook API URL: {}/{}", config.base_url, config.api_version);
        tracing::debug!(
            "Rate limit budget: {} points per {}s",
            config.rate_limit_points,
            config.rate_limit_window_secs
        );
        tracing::debug!("Request timeout: {}s", config.request_timeout_secs);

        Ok(config)
    }

    /// Checks URL and version shape.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("FACEBOOK_API_BASE_URL cannot be empty");
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("FACEBOOK_API_BASE_URL must start with http:// or https://");
        }
        if !self.api_version.starts_with('v') || self.api_version.len() < 2 {
            anyhow::bail!("FACEBOOK_API_VERSION must look like v18.0");
        }
        if self.rate_limit_points == 0 || self.rate_limit_window_secs == 0 {
            anyhow::bail!("Rate limit points and window must be greater than zero");
        }
        Ok(())
    }
}

fn parse_positive<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            let value: T = raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("{} must be a valid number", name))?;
            if value <= T::default() {
                anyhow::bail!("{} must be greater than zero", name);
            }
            Ok(value)
        }
        _ => Ok(default),
    }
}

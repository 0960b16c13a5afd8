use fb_ads_client::config::Config;
use fb_ads_client::facebook_client::FacebookClient;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "Usage: fb-ads-client <command> [args]

Commands:
  validate <ad_account_id>        Check that an ad account exists and is active
  get <campaign_id>               Show a campaign
  list <ad_account_id> [limit]    List campaigns of an ad account (default limit 25)
  sync-status <campaign_id>       Check whether a campaign is still on Facebook
  delete <campaign_id>            Mark a campaign DELETED";

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn required<'a>(args: &'a [String], index: usize, name: &str) -> anyhow::Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("missing <{}>\n\n{}", name, USAGE))
}

/// Operator entry point for the Facebook Marketing API client.
///
/// Loads configuration from the environment, runs one command and prints the
/// result as JSON.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fb_ads_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = Config::from_env()?;
    let client = FacebookClient::new(&config)?;

    match command.as_str() {
        "validate" => {
            let result = client
                .validate_ad_account(required(&args, 1, "ad_account_id")?)
                .await?;
            print_json(&result)?;
        }
        "get" => {
            let campaign = client
                .get_campaign(required(&args, 1, "campaign_id")?)
                .await?;
            print_json(&campaign)?;
        }
        "list" => {
            let limit = match args.get(2) {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("limit must be a number"))?,
                None => 25,
            };
            let page = client
                .list_campaigns(required(&args, 1, "ad_account_id")?, limit)
                .await?;
            print_json(&page)?;
        }
        "sync-status" => {
            let status = client
                .campaign_sync_status(required(&args, 1, "campaign_id")?)
                .await?;
            print_json(&status)?;
        }
        "delete" => {
            let deletion = client
                .delete_campaign(required(&args, 1, "campaign_id")?)
                .await?;
            print_json(&deletion)?;
        }
        other => anyhow::bail!("unknown command '{}'\n\n{}", other, USAGE),
    }

    tracing::debug!("Rate limit usage: {:?}", client.rate_limit_usage());
    Ok(())
}

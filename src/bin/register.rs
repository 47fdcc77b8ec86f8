use anyhow::Context as _;
use klokapp_client_sdk::ChatClient;
use klokapp_client_sdk::config::Settings;
use klokapp_client_sdk::registration::{ACCOUNTS_FILE_VAR, DEFAULT_ACCOUNTS_FILE, Registrar};
use tracing_subscriber::EnvFilter;

/// Signs up fresh wallets under a referral code and appends them to the accounts file.
///
/// Usage: `cargo run --bin register -- <referral-code> [count]` (count defaults to 1; the code
/// falls back to `REFERRAL_CODE`).
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = Settings::from_env().context("invalid configuration")?;
    let mut args = std::env::args().skip(1);
    let referral_code = args
        .next()
        .or(settings.referral_code.clone())
        .context("usage: register <referral-code> [count]")?;
    let count = match args.next() {
        Some(arg) => arg
            .parse::<u32>()
            .with_context(|| format!("count must be a positive integer, got `{arg}`"))?,
        None => 1,
    };
    let accounts_file =
        std::env::var(ACCOUNTS_FILE_VAR).unwrap_or_else(|_| DEFAULT_ACCOUNTS_FILE.to_owned());

    let client = ChatClient::new(&settings.base_url, settings.client.clone())
        .context("failed to build HTTP client")?;

    tracing::info!(%referral_code, count, %accounts_file, "registering accounts");
    let report = Registrar::new(client, referral_code, accounts_file)
        .run(count)
        .await
        .context("failed to record new account")?;

    if report.created > 0 && report.succeeded == 0 {
        anyhow::bail!("none of the {} accounts could be registered", report.created);
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

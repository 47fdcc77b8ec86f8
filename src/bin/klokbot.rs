use std::time::Duration;

use anyhow::Context as _;
use klokapp_client_sdk::ChatClient;
use klokapp_client_sdk::auth::VerificationChain;
use klokapp_client_sdk::config::Settings;
use klokapp_client_sdk::scheduler::Scheduler;
use klokapp_client_sdk::wallet::load_wallets;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

/// How long an in-flight pass may keep going after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);
/// Stats heartbeat, independent of pass boundaries.
const STATS_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = Settings::from_env().context("invalid configuration")?;
    let wallets = load_wallets(&settings.private_keys);

    let client = ChatClient::new(&settings.base_url, settings.client.clone())
        .context("failed to build HTTP client")?;
    let chain = VerificationChain::default().with_referral_code(settings.referral_code.clone());
    let mut scheduler = Scheduler::new(client, chain, wallets, settings.scheduler.clone())
        .context("no valid wallets found, check PRIVATE_KEY(S)")?;

    tracing::info!(
        wallets = scheduler.addresses().count(),
        mode = %settings.scheduler.schedule_mode,
        persistent_threads = settings.scheduler.persistent_threads,
        message_delay_min = ?settings.scheduler.message_delay_min,
        message_delay_max = ?settings.scheduler.message_delay_max,
        "klokbot initialized"
    );

    let shutdown = scheduler.shutdown_handle();
    let stats = scheduler.stats_handle();
    {
        let run = scheduler.run();
        tokio::pin!(run);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let mut heartbeat = tokio::time::interval(STATS_INTERVAL);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                () = &mut run => break,
                _ = heartbeat.tick() => stats.log(),
                signal = &mut ctrl_c => {
                    signal.context("failed to listen for ctrl-c")?;
                    tracing::info!("shutting down");
                    shutdown.stop();
                    if tokio::time::timeout(SHUTDOWN_GRACE, &mut run).await.is_err() {
                        tracing::warn!("pass still in flight, abandoning it");
                    }
                    break;
                }
            }
        }
    }

    scheduler.log_stats();
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

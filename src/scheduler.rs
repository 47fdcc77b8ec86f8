//! Round-robin spending of each wallet's message quota.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use alloy::primitives::Address;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::VerificationChain;
use crate::config::SchedulerConfig;
use crate::pacing::{RandomSource, Sleeper, StdRandom, TokioSleeper};
use crate::questions::QuestionBank;
use crate::stats::{RunStats, StatsHandle, format_runtime};
use crate::types::{Session, Thread};
use crate::wallet::Wallet;
use crate::{ChatClient, Error, Result, short_address};

const REPLY_PREVIEW_CHARS: usize = 100;

/// Where a wallet stands in its sign-in/spend lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletPhase {
    Unauthenticated,
    Authenticating,
    Active,
    QuotaExhausted,
    /// The last cycle ended on a quota or session error; the session has been dropped.
    Faulted,
}

/// What happened during one wallet's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    AuthFailed,
    QuotaFailed,
    Exhausted,
    Spent { planned: u32, sent: u32 },
}

/// Requests a graceful stop. The scheduler finishes the current pass first.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct WalletSlot {
    wallet: Wallet,
    session: Option<Session>,
    thread: Option<Thread>,
    phase: WalletPhase,
}

pub struct Scheduler {
    client: ChatClient,
    chain: VerificationChain,
    config: SchedulerConfig,
    slots: Vec<WalletSlot>,
    stats: StatsHandle,
    questions: QuestionBank,
    random: Box<dyn RandomSource>,
    sleeper: Arc<dyn Sleeper>,
    running: Arc<AtomicBool>,
}

impl Scheduler {
    /// Fails with [`Error::NoWallets`] when `wallets` is empty. Duplicate addresses are dropped.
    pub fn new(
        client: ChatClient,
        chain: VerificationChain,
        wallets: Vec<Wallet>,
        config: SchedulerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut slots: Vec<WalletSlot> = Vec::with_capacity(wallets.len());
        for wallet in wallets {
            if slots.iter().any(|slot| slot.wallet.address() == wallet.address()) {
                tracing::warn!(wallet = %short_address(&wallet.address()), "duplicate wallet ignored");
                continue;
            }
            slots.push(WalletSlot {
                wallet,
                session: None,
                thread: None,
                phase: WalletPhase::Unauthenticated,
            });
        }
        if slots.is_empty() {
            return Err(Error::NoWallets);
        }

        let stats = StatsHandle::new(RunStats::new(slots.iter().map(|slot| slot.wallet.address())));
        Ok(Self {
            client,
            chain,
            config,
            slots,
            stats,
            questions: QuestionBank::default(),
            random: Box::new(StdRandom::from_entropy()),
            sleeper: Arc::new(TokioSleeper),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    #[must_use]
    pub fn with_random(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Box::new(random);
        self
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.running))
    }

    /// Counters as of now.
    #[must_use]
    pub fn stats(&self) -> RunStats {
        self.stats.snapshot()
    }

    /// A handle that can read the counters while [`Scheduler::run`] holds the scheduler.
    #[must_use]
    pub fn stats_handle(&self) -> StatsHandle {
        self.stats.clone()
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.slots.iter().map(|slot| slot.wallet.address())
    }

    #[must_use]
    pub fn session(&self, address: &Address) -> Option<&Session> {
        self.slot(address).and_then(|slot| slot.session.as_ref())
    }

    #[must_use]
    pub fn thread(&self, address: &Address) -> Option<&Thread> {
        self.slot(address).and_then(|slot| slot.thread.as_ref())
    }

    #[must_use]
    pub fn phase(&self, address: &Address) -> Option<WalletPhase> {
        self.slot(address).map(|slot| slot.phase)
    }

    fn slot(&self, address: &Address) -> Option<&WalletSlot> {
        self.slots.iter().find(|slot| slot.wallet.address() == *address)
    }

    /// Runs passes until [`ShutdownHandle::stop`] is called.
    ///
    /// The running flag is checked at the top of each pass and before the long pause, never in
    /// the middle of a wallet's turn.
    pub async fn run(&mut self) {
        tracing::info!(
            wallets = self.slots.len(),
            mode = %self.config.schedule_mode,
            persistent_threads = self.config.persistent_threads,
            "scheduler started"
        );

        while self.running.load(Ordering::SeqCst) {
            self.run_pass().await;
            self.log_stats();

            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            tracing::info!(pause = ?self.config.pass_delay, "all wallets processed, sleeping");
            self.sleeper.sleep(self.config.pass_delay).await;
        }

        tracing::info!("scheduler stopped");
    }

    /// Gives every wallet one turn, in order.
    pub async fn run_pass(&mut self) -> Vec<CycleOutcome> {
        let mut outcomes = Vec::with_capacity(self.slots.len());
        for index in 0..self.slots.len() {
            outcomes.push(self.process_wallet(index).await);
            self.sleeper.sleep(self.config.wallet_delay).await;
        }
        outcomes
    }

    async fn process_wallet(&mut self, index: usize) -> CycleOutcome {
        let address = self.slots[index].wallet.address();
        let short = short_address(&address);

        if self.slots[index].session.is_none() {
            self.slots[index].phase = WalletPhase::Authenticating;
            let result = self.chain.authenticate(&self.client, &self.slots[index].wallet).await;
            match result {
                Ok(session) => self.slots[index].session = Some(session),
                Err(e) => {
                    tracing::error!(wallet = %short, error = %e, "failed to connect wallet");
                    self.stats.update(RunStats::record_error);
                    self.slots[index].phase = WalletPhase::Unauthenticated;
                    return CycleOutcome::AuthFailed;
                }
            }
        }
        let Some(token) = self.slots[index].session.as_ref().map(|s| s.token.clone()) else {
            return CycleOutcome::AuthFailed;
        };

        let quota = match self.client.quota(&token, self.config.premium_threshold).await {
            Ok(quota) => quota,
            Err(e) => {
                tracing::error!(wallet = %short, error = %e, "failed to get limits, dropping session");
                self.stats.update(RunStats::record_error);
                self.drop_session(index);
                return CycleOutcome::QuotaFailed;
            }
        };
        tracing::info!(
            wallet = %short,
            remaining = quota.remaining,
            total = quota.total,
            premium = quota.is_premium,
            "quota"
        );

        if quota.remaining == 0 {
            match quota.reset_at {
                Some(reset_at) => {
                    tracing::warn!(wallet = %short, %reset_at, "no messages remaining");
                }
                None => tracing::warn!(wallet = %short, "no messages remaining"),
            }
            self.slots[index].phase = WalletPhase::QuotaExhausted;
            return CycleOutcome::Exhausted;
        }

        self.slots[index].phase = WalletPhase::Active;
        let planned = self.config.schedule_mode.chat_count(&quota);
        tracing::info!(wallet = %short, chats = planned, "starting chats");

        let mut sent = 0;
        for i in 0..planned {
            let thread_id = self.resolve_thread(index);
            let prompt = self.questions.pick(self.random.as_mut());
            tracing::info!(
                wallet = %short,
                n = i + 1,
                of = planned,
                category = %prompt.category,
                question = prompt.question,
                "sending message"
            );

            match self.client.send_chat(&token, thread_id, prompt.question).await {
                Ok(reply) => {
                    self.stats.update(|stats| stats.record_chat(address));
                    sent += 1;
                    tracing::info!(wallet = %short, reply = %preview(&reply), "response received");
                }
                Err(e) => {
                    tracing::error!(wallet = %short, thread = %thread_id, error = %e, "failed to send message");
                    self.stats.update(RunStats::record_error);
                    if e.invalidates_thread() {
                        self.slots[index].thread = None;
                    }
                    if e.invalidates_session() {
                        self.drop_session(index);
                        break;
                    }
                }
            }

            if i + 1 < planned {
                let pause = self
                    .random
                    .duration_between(self.config.message_delay_min, self.config.message_delay_max);
                self.sleeper.sleep(pause).await;
            }
        }

        CycleOutcome::Spent { planned, sent }
    }

    /// Returns the thread to post to, creating and storing a new one when there is no reusable
    /// thread for this wallet.
    fn resolve_thread(&mut self, index: usize) -> Uuid {
        let persistent = self.config.persistent_threads;
        let max_age = self.config.max_thread_age;
        let slot = &mut self.slots[index];

        if persistent {
            if let Some(thread) = &slot.thread {
                if !thread.is_expired(max_age, Utc::now()) {
                    tracing::debug!(thread = %thread.id, "reusing thread");
                    return thread.id;
                }
                tracing::debug!(thread = %thread.id, "thread expired");
            }
        }

        let thread = Thread::new(slot.wallet.address());
        let id = thread.id;
        tracing::debug!(thread = %id, "created new thread");
        slot.thread = Some(thread);
        id
    }

    fn drop_session(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.session = None;
        slot.phase = WalletPhase::Faulted;
    }

    /// Logs run totals followed by one line per wallet.
    pub fn log_stats(&self) {
        let stats = self.stats.snapshot();
        tracing::info!(
            runtime = %format_runtime(stats.runtime()),
            total_chats = stats.total_chats,
            success_rate = stats.success_rate(),
            errors = stats.errors,
            "bot statistics"
        );
        for slot in &self.slots {
            let address = slot.wallet.address();
            tracing::info!(
                wallet = %short_address(&address),
                chats = stats.chats_for(&address),
                connected = slot.session.is_some(),
                phase = ?slot.phase,
                "wallet statistics"
            );
        }
    }
}

fn preview(reply: &str) -> String {
    let clean = reply
        .split('\n')
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let clean = clean.trim();
    if clean.chars().count() > REPLY_PREVIEW_CHARS {
        let head: String = clean.chars().take(REPLY_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        clean.to_owned()
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use alloy::primitives::Address;

use crate::short_address;

/// Counters for the lifetime of one scheduler.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub total_chats: u64,
    pub total_responses: u64,
    pub errors: u64,
    pub per_wallet: HashMap<Address, u64>,
    pub started_at: Instant,
}

impl RunStats {
    #[must_use]
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        Self {
            total_chats: 0,
            total_responses: 0,
            errors: 0,
            per_wallet: addresses.into_iter().map(|address| (address, 0)).collect(),
            started_at: Instant::now(),
        }
    }

    pub(crate) fn record_chat(&mut self, address: Address) {
        self.total_chats += 1;
        self.total_responses += 1;
        *self.per_wallet.entry(address).or_default() += 1;
    }

    pub(crate) fn record_error(&mut self) {
        self.errors += 1;
    }

    #[must_use]
    pub fn chats_for(&self, address: &Address) -> u64 {
        self.per_wallet.get(address).copied().unwrap_or_default()
    }

    /// Responses per chat as a whole percentage; 0 before the first chat.
    #[must_use]
    pub fn success_rate(&self) -> u64 {
        if self.total_chats == 0 {
            return 0;
        }
        (self.total_responses * 100 + self.total_chats / 2) / self.total_chats
    }

    #[must_use]
    pub fn runtime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Shared view of a scheduler's [`RunStats`], readable while the scheduler is running.
#[derive(Debug, Clone)]
pub struct StatsHandle(Arc<Mutex<RunStats>>);

impl StatsHandle {
    pub(crate) fn new(stats: RunStats) -> Self {
        Self(Arc::new(Mutex::new(stats)))
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut RunStats)) {
        let mut stats = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut stats);
    }

    #[must_use]
    pub fn snapshot(&self) -> RunStats {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Logs run totals followed by one chat count per wallet.
    pub fn log(&self) {
        let stats = self.snapshot();
        tracing::info!(
            runtime = %format_runtime(stats.runtime()),
            total_chats = stats.total_chats,
            success_rate = stats.success_rate(),
            errors = stats.errors,
            "bot statistics"
        );
        let mut wallets: Vec<_> = stats.per_wallet.iter().collect();
        wallets.sort_by_key(|(address, _)| **address);
        for (address, chats) in wallets {
            tracing::info!(wallet = %short_address(address), chats, "wallet chats");
        }
    }
}

/// Formats a duration as `1d 2h 3m 4s`.
#[must_use]
pub fn format_runtime(runtime: Duration) -> String {
    let secs = runtime.as_secs();
    format!(
        "{}d {}h {}m {}s",
        secs / 86_400,
        (secs / 3_600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}

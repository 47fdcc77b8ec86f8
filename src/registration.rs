//! Bulk sign-up of fresh wallets under a referral code.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use alloy::hex;
use alloy::signers::local::PrivateKeySigner;

use crate::auth::VerificationChain;
use crate::pacing::{RandomSource, Sleeper, StdRandom, TokioSleeper};
use crate::wallet::Wallet;
use crate::{ChatClient, Result, short_address};

pub const DEFAULT_ACCOUNTS_FILE: &str = "accounts.txt";
pub const ACCOUNTS_FILE_VAR: &str = "ACCOUNTS_FILE";

const ACCOUNT_DELAY_MIN: Duration = Duration::from_secs(3);
const ACCOUNT_DELAY_MAX: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    pub created: u32,
    pub succeeded: u32,
    pub failed: u32,
}

/// Generates wallets, records their keys and signs each one up with a referral code.
pub struct Registrar {
    client: ChatClient,
    chain: VerificationChain,
    referral_code: String,
    accounts_file: PathBuf,
    random: Box<dyn RandomSource>,
    sleeper: Arc<dyn Sleeper>,
}

impl Registrar {
    pub fn new(
        client: ChatClient,
        referral_code: impl Into<String>,
        accounts_file: impl Into<PathBuf>,
    ) -> Self {
        let referral_code = referral_code.into();
        Self {
            client,
            chain: VerificationChain::registration().with_referral_code(Some(referral_code.clone())),
            referral_code,
            accounts_file: accounts_file.into(),
            random: Box::new(StdRandom::from_entropy()),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the verification chain. The referral code is applied to `chain`.
    #[must_use]
    pub fn with_chain(mut self, chain: VerificationChain) -> Self {
        self.chain = chain.with_referral_code(Some(self.referral_code.clone()));
        self
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
    pub fn accounts_file(&self) -> &Path {
        &self.accounts_file
    }

    /// Creates and signs up `count` accounts, pausing between them.
    ///
    /// Each key is appended to the accounts file before its sign-up is attempted, so failed
    /// accounts are kept too. Failing to write that file stops the run.
    pub async fn run(&mut self, count: u32) -> Result<RegistrationReport> {
        let mut report = RegistrationReport::default();

        for i in 0..count {
            let signer = PrivateKeySigner::random();
            self.record_account(&signer)?;
            report.created += 1;

            let wallet = Wallet::new(signer);
            let short = short_address(&wallet.address());
            tracing::info!(wallet = %short, n = i + 1, of = count, "new wallet");

            let result = self.chain.authenticate(&self.client, &wallet).await;
            match result {
                Ok(_) => {
                    report.succeeded += 1;
                    tracing::info!(wallet = %short, "account registered");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(wallet = %short, error = %e, "registration failed");
                }
            }

            if i + 1 < count {
                let pause = self
                    .random
                    .duration_between(ACCOUNT_DELAY_MIN, ACCOUNT_DELAY_MAX);
                tracing::info!(?pause, "waiting before next account");
                self.sleeper.sleep(pause).await;
            }
        }

        tracing::info!(
            created = report.created,
            succeeded = report.succeeded,
            failed = report.failed,
            "registration finished"
        );
        Ok(report)
    }

    fn record_account(&self, signer: &PrivateKeySigner) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.accounts_file)?;
        writeln!(
            file,
            "{} | {}",
            signer.address(),
            hex::encode_prefixed(signer.to_bytes())
        )?;
        Ok(())
    }
}

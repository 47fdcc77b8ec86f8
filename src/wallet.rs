use std::fmt;
use std::str::FromStr as _;
use std::sync::Arc;

use alloy::hex;
use alloy::primitives::Address;
use alloy::signers::Signer as _;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;

use crate::{Result, short_address};

/// Produces EIP-191 personal-message signatures for one address.
#[async_trait]
pub trait MessageSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Returns the `0x`-prefixed hex signature of `message`.
    async fn sign_message(&self, message: &str) -> Result<String>;
}

#[async_trait]
impl MessageSigner for PrivateKeySigner {
    fn address(&self) -> Address {
        alloy::signers::Signer::address(self)
    }

    async fn sign_message(&self, message: &str) -> Result<String> {
        let signature = alloy::signers::Signer::sign_message(self, message.as_bytes()).await?;
        Ok(hex::encode_prefixed(signature.as_bytes()))
    }
}

#[derive(Clone)]
pub struct Wallet {
    address: Address,
    signer: Arc<dyn MessageSigner>,
}

impl Wallet {
    pub fn new(signer: impl MessageSigner + 'static) -> Self {
        Self {
            address: signer.address(),
            signer: Arc::new(signer),
        }
    }

    /// Parses a hex private key, with or without `0x` and surrounding quotes.
    pub fn from_private_key(key: &str) -> Result<Self> {
        let key = key.trim().trim_matches('"').trim_matches('\'');
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer = PrivateKeySigner::from_str(key)?.with_chain_id(Some(1));
        Ok(Self::new(signer))
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn sign(&self, message: &str) -> Result<String> {
        self.signer.sign_message(message).await
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Builds wallets from private keys, skipping keys that fail to parse.
#[must_use]
pub fn load_wallets(keys: &[String]) -> Vec<Wallet> {
    let mut wallets = Vec::with_capacity(keys.len());
    for key in keys {
        match Wallet::from_private_key(key) {
            Ok(wallet) => {
                tracing::info!(wallet = %short_address(&wallet.address()), "wallet ready");
                wallets.push(wallet);
            }
            Err(e) => {
                let prefix: String = key.trim().chars().take(6).collect();
                tracing::error!(key = %format!("{prefix}..."), error = %e, "invalid private key");
            }
        }
    }
    wallets
}

use std::fmt;

use alloy::hex;
use alloy::primitives::Address;
use chrono::{DateTime, SecondsFormat, Utc};

/// An EIP-4361 sign-in message as the service expects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiweMessage {
    pub domain: String,
    pub address: Address,
    pub uri: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
}

impl SiweMessage {
    /// A mainnet message with a fresh 256-bit nonce, issued now.
    #[must_use]
    pub fn new(domain: &str, origin: &str, address: Address) -> Self {
        Self {
            domain: domain.to_owned(),
            address,
            uri: format!("{}/", origin.trim_end_matches('/')),
            chain_id: 1,
            nonce: hex::encode(rand::random::<[u8; 32]>()),
            issued_at: Utc::now(),
        }
    }
}

impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} wants you to sign in with your Ethereum account:", self.domain)?;
        writeln!(f, "{}", self.address)?;
        writeln!(f)?;
        writeln!(f)?;
        writeln!(f, "URI: {}", self.uri)?;
        writeln!(f, "Version: 1")?;
        writeln!(f, "Chain ID: {}", self.chain_id)?;
        writeln!(f, "Nonce: {}", self.nonce)?;
        write!(
            f,
            "Issued At: {}",
            self.issued_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn renders_the_expected_layout() {
        let message = SiweMessage {
            domain: "klokapp.ai".to_owned(),
            address: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            uri: "https://klokapp.ai/".to_owned(),
            chain_id: 1,
            nonce: "abcd".to_owned(),
            issued_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        };

        assert_eq!(
            message.to_string(),
            "klokapp.ai wants you to sign in with your Ethereum account:\n\
             0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\n\
             \n\
             \n\
             URI: https://klokapp.ai/\n\
             Version: 1\n\
             Chain ID: 1\n\
             Nonce: abcd\n\
             Issued At: 2025-01-02T03:04:05.000Z"
        );
    }

    #[test]
    fn nonces_are_fresh_and_wide() {
        let a = SiweMessage::new("klokapp.ai", "https://klokapp.ai", Address::ZERO);
        let b = SiweMessage::new("klokapp.ai", "https://klokapp.ai", Address::ZERO);

        assert_eq!(a.nonce.len(), 64);
        assert_ne!(a.nonce, b.nonce);
        assert_eq!(a.uri, "https://klokapp.ai/");
    }
}

use alloy::hex;
use alloy::signers::local::PrivateKeySigner;

/// Prints fresh wallets and a ready-to-paste `PRIVATE_KEYS` line.
///
/// Usage: `cargo run --bin keygen -- [count]` (defaults to 1).
fn main() -> anyhow::Result<()> {
    let count = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("count must be a positive integer, got `{arg}`"))?,
        None => 1,
    };

    println!("\nGenerating {count} fresh wallet(s)...\n");

    let mut keys = Vec::with_capacity(count);
    for i in 0..count {
        let signer = PrivateKeySigner::random();
        let key_hex = hex::encode_prefixed(signer.to_bytes());

        println!("--- Wallet #{} ---", i + 1);
        println!("Address:     {}", signer.address());
        println!("Private Key: {key_hex}");
        println!();
        keys.push(key_hex);
    }

    println!("Add to .env:");
    println!("PRIVATE_KEYS={}", keys.join(","));
    Ok(())
}

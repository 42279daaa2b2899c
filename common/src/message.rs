// common/src/message.rs

/// Build the human-readable authentication message a wallet is asked to sign.
///
/// The exact byte sequence matters: the server reconstructs this string from
/// the stored nonce during verification, and any drift (trimming, casing,
/// locale-dependent formatting) makes every signature check fail. Keep this
/// function pure and total.
pub fn auth_message(wallet_address: &str, nonce: &str, timestamp: i64) -> String {
    format!(
        "Welcome to SuperPool!\n\n\
         This request will not trigger a blockchain transaction.\n\n\
         Wallet address:\n{}\n\n\
         Nonce:\n{}\n\
         Timestamp:\n{}",
        wallet_address, nonce, timestamp
    )
}

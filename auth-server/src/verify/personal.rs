// auth-server/src/verify/personal.rs
use alloy_primitives::{Address, Signature};

use super::VerifyError;

/// Recover the signing address from an Ethereum personal-sign signature.
///
/// The message is prefixed per EIP-191 before hashing, matching what
/// `personal_sign` wallets do.
pub fn recover_personal_sign(message: &[u8], signature: &[u8]) -> Result<Address, VerifyError> {
    if signature.len() != 65 {
        return Err(VerifyError::InvalidSignature(format!(
            "signature must be 65 bytes, got {}",
            signature.len()
        )));
    }

    let sig = Signature::from_raw(signature)
        .map_err(|e| VerifyError::InvalidSignature(format!("malformed signature: {}", e)))?;

    sig.recover_address_from_msg(message)
        .map_err(|e| VerifyError::InvalidSignature(format!("recovery failed: {}", e)))
}

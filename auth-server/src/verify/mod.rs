// auth-server/src/verify/mod.rs
pub mod personal;
pub mod safe;
pub mod typed;

use alloy_primitives::Address;
use common::SignatureKind;
use std::sync::Arc;
use thiserror::Error;

use safe::{SafeContractGateway, SafeVerifier};

/// Signature verification failure kinds.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The signature was malformed or ECDSA recovery threw
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A valid signature from the wrong wallet. Kept distinct from
    /// `InvalidSignature`: someone presented another wallet's signature as
    /// this wallet's, which is a different trust violation than a garbled
    /// payload.
    #[error("signature was produced by {recovered}, not the claimed wallet {claimed}")]
    AddressMismatch { claimed: String, recovered: String },

    /// Safe contract-based verification rejected the signature
    #[error("Safe wallet verification failed: {0}")]
    SafeVerificationFailed(String),
}

/// Everything needed to check one signature against one pending nonce
pub struct VerificationInput<'a> {
    pub wallet: Address,
    pub message: &'a str,
    pub nonce: &'a str,
    pub timestamp: i64,
    pub chain_id: u64,
    pub signature: &'a str,
}

/// Dispatches verification across the supported signature kinds
pub struct SignatureVerifier {
    safe: SafeVerifier,
}

impl SignatureVerifier {
    pub fn new(gateway: Arc<dyn SafeContractGateway>) -> Self {
        Self {
            safe: SafeVerifier::new(gateway),
        }
    }

    /// Verify `input.signature` according to `kind` and confirm the signer
    /// is the claimed wallet.
    pub async fn verify(
        &self,
        kind: SignatureKind,
        input: VerificationInput<'_>,
    ) -> Result<(), VerifyError> {
        match kind {
            SignatureKind::PersonalSign => {
                let bytes = decode_hex_signature(input.signature)?;
                let recovered =
                    personal::recover_personal_sign(input.message.as_bytes(), &bytes)?;
                ensure_expected_signer(input.wallet, recovered)
            }
            SignatureKind::TypedData => {
                let bytes = decode_hex_signature(input.signature)?;
                let recovered = typed::recover_typed_data(
                    input.wallet,
                    input.nonce,
                    input.timestamp,
                    input.chain_id,
                    &bytes,
                )?;
                ensure_expected_signer(input.wallet, recovered)
            }
            SignatureKind::SafeWallet => {
                let verification = self
                    .safe
                    .verify(input.chain_id, input.wallet, input.message, input.signature)
                    .await;

                for warning in &verification.warnings {
                    tracing::warn!(
                        "Safe verification warning for {}: {}",
                        input.wallet,
                        warning
                    );
                }

                if verification.is_valid {
                    Ok(())
                } else {
                    Err(VerifyError::SafeVerificationFailed(
                        verification
                            .error
                            .unwrap_or_else(|| "unknown reason".to_string()),
                    ))
                }
            }
        }
    }
}

fn decode_hex_signature(signature: &str) -> Result<Vec<u8>, VerifyError> {
    let raw = signature
        .strip_prefix("0x")
        .ok_or_else(|| VerifyError::InvalidSignature("missing 0x prefix".to_string()))?;
    hex::decode(raw).map_err(|e| VerifyError::InvalidSignature(format!("not valid hex: {}", e)))
}

// Address equality is byte equality; hex casing was normalized at parse time
fn ensure_expected_signer(claimed: Address, recovered: Address) -> Result<(), VerifyError> {
    if recovered == claimed {
        Ok(())
    } else {
        Err(VerifyError::AddressMismatch {
            claimed: format!("{:#x}", claimed),
            recovered: format!("{:#x}", recovered),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_signature_requires_prefix() {
        assert!(matches!(
            decode_hex_signature("deadbeef"),
            Err(VerifyError::InvalidSignature(_))
        ));
        assert!(matches!(
            decode_hex_signature("0xzz"),
            Err(VerifyError::InvalidSignature(_))
        ));
        assert_eq!(decode_hex_signature("0xdeadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_ensure_expected_signer_reports_both_addresses() {
        let claimed = Address::from([0x11u8; 20]);
        let recovered = Address::from([0x22u8; 20]);

        let err = ensure_expected_signer(claimed, recovered).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("0x1111111111111111111111111111111111111111"));
        assert!(text.contains("0x2222222222222222222222222222222222222222"));
    }
}

// auth-client/src/signer.rs
use async_trait::async_trait;
use common::SignatureKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("user rejected the signing request")]
    Rejected,

    #[error("wallet signing failed: {0}")]
    Failed(String),
}

/// Everything the wallet needs to produce a signature for one challenge.
/// Personal-sign wallets sign `message` as-is; typed-data wallets rebuild
/// the EIP-712 payload from the nonce, timestamp and chain id.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub wallet_address: String,
    pub message: String,
    pub nonce: String,
    pub timestamp: i64,
    pub chain_id: u64,
}

/// Seam to the connected wallet's signing capability. The kind the wallet
/// reports decides which verification path the backend runs.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// The signature kind this wallet produces
    fn signature_kind(&self) -> SignatureKind;

    /// Produce the signature payload for the challenge (0x-prefixed hex for
    /// EOA kinds, the Safe contract-signature payload for Safe wallets)
    async fn sign(&self, request: &SigningRequest) -> Result<String, SignerError>;
}

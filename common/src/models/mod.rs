pub mod device;
pub mod nonce;
pub mod user;

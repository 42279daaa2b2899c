pub mod config;
pub mod message;
pub mod models;
pub mod types;
pub mod utils;

pub use config::*;
pub use message::*;
pub use types::*;
pub use utils::*;

//! OAuth token management with storage and refresh capabilities.

pub mod encryption;
mod file;
mod manager;
mod response;
mod storage;
mod tokens;

pub use encryption::EncryptedStorage;
pub use file::FileStorage;
pub use manager::{RefreshRequest, TokenManager};
pub use storage::{MemoryStorage, Storage};
pub use tokens::{Token, DEFAULT_EXPIRES_IN, EXPIRY_MARGIN_MS};

pub(crate) use response::read_token_response;

//! The execution authority is the system of record for every will. The core
//! asks it to commit intents and always takes its answer as ground truth.

mod http;
mod local;

use async_trait::async_trait;

pub use http::HttpAuthority;
pub use local::{Committed, LocalAuthority};

use crate::error::WillError;
use crate::will::{Address, Intent, WillSnapshot};

#[async_trait]
pub trait Authority: Send + Sync {
    /// Re-validates and commits `intent` for `owner`'s current will, returning
    /// the confirmed state.
    async fn submit(&self, owner: &Address, intent: Intent) -> Result<WillSnapshot, WillError>;

    /// Current will of `owner`, or `None` if they never registered.
    async fn fetch(&self, owner: &Address) -> Result<Option<WillSnapshot>, WillError>;
}

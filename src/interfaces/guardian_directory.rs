//! Guardian directory interface.

use async_trait::async_trait;

use super::journey_store::Result;

/// Lookup of delivery addresses for guardians.
///
/// Guardians register a device push token; notifiers resolve it when a
/// journey they are responsible for changes status.
#[async_trait]
pub trait GuardianDirectory: Send + Sync {
    /// Store or replace the push token for a guardian.
    async fn register_push_token(&self, guardian_ref: &str, token: &str) -> Result<()>;

    /// The current push token for a guardian, if one was registered.
    async fn push_token(&self, guardian_ref: &str) -> Result<Option<String>>;
}

//! Identity provider seam.
//!
//! Authentication itself is an external concern. The relay only needs to
//! know, at the moment an event is handled, whether the connection is
//! authenticated and under which username.

use async_trait::async_trait;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a transport-supplied credential to a username, if valid.
    async fn identify(&self, token: Option<&str>) -> Option<String>;
}

/// Trusts the handshake credential as the username. Suitable behind a
/// fronting proxy that has already authenticated the user; real deployments
/// supply their own provider.
pub struct TrustedTokenIdentity;

#[async_trait]
impl IdentityProvider for TrustedTokenIdentity {
    async fn identify(&self, token: Option<&str>) -> Option<String> {
        token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
    }
}

//! Bearer token source for API calls.
//!
//! Acquiring and refreshing tokens is left to the embedding application;
//! the client only asks a [`TokenProvider`] for the current value.

use std::future::Future;
use std::pin::Pin;

use crate::client::Error;

/// Supplies the bearer token attached to every API call.
///
/// Implementations are shared across concurrent sends and must be safe to
/// call from several tasks at once.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Pin<Box<dyn Future<Output = Result<String, Error>> + Send + '_>>;
}

/// A fixed token, e.g. read from the environment at startup.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Pin<Box<dyn Future<Output = Result<String, Error>> + Send + '_>> {
        Box::pin(async move {
            if self.0.is_empty() {
                return Err(Error::Token("empty bearer token".into()));
            }
            Ok(self.0.clone())
        })
    }
}

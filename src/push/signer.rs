use crate::ports::{KeyValueStore, TimeProvider};
use crate::store::StoreError;
use crate::types::push::ApnsCredentials;

use jwt_simple::prelude::{Claims, Duration as JwtDuration, ECDSAP256KeyPairLike, ES256KeyPair};
use time::OffsetDateTime;

use std::time::Duration;

pub(crate) const TOKEN_CACHE_KEY: &str = "$token";
/// Gateway tokens are valid for an hour; refresh well before that.
pub(crate) const TOKEN_CACHE_TTL: Duration = Duration::from_secs(45 * 60);

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("push credentials are not configured")]
    NotConfigured,
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
    #[error("failed to sign token: {0}")]
    Sign(String),
}

/// Holds the most recently minted token under a fixed key with a TTL.
#[derive(Clone)]
pub struct TokenCache<S> {
    store: S,
}

impl<S: KeyValueStore> TokenCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get(&self) -> Result<Option<String>, StoreError> {
        self.store.get(TOKEN_CACHE_KEY).await
    }

    pub async fn put(&self, token: &str) -> Result<(), StoreError> {
        self.store
            .put(TOKEN_CACHE_KEY, token.to_string(), Some(TOKEN_CACHE_TTL))
            .await
    }

    #[cfg(test)]
    pub(crate) async fn evict(&self) -> Result<bool, StoreError> {
        self.store.delete(TOKEN_CACHE_KEY).await
    }
}

/// Mints ES256 bearer tokens for the push gateway and reuses them while cached.
///
/// Two requests missing the cache at the same time both mint; both tokens are
/// valid and the last write to the cache wins.
#[derive(Clone)]
pub struct TokenSigner<S, T> {
    credentials: Option<ApnsCredentials>,
    cache: TokenCache<S>,
    time: T,
}

impl<S, T> TokenSigner<S, T>
where
    S: KeyValueStore,
    T: TimeProvider,
{
    pub fn new(credentials: Option<ApnsCredentials>, cache: TokenCache<S>, time: T) -> Self {
        Self {
            credentials,
            cache,
            time,
        }
    }

    /// Returns the cached token as-is; credentials are only needed to mint.
    pub async fn authorization_token(&self) -> Result<String, SigningError> {
        match self.cache.get().await {
            Ok(Some(token)) => return Ok(token),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "token cache read failed, minting"),
        }

        let credentials = self
            .credentials
            .as_ref()
            .ok_or(SigningError::NotConfigured)?;
        let token = mint_token(credentials, self.time.now())?;
        if let Err(err) = self.cache.put(&token).await {
            tracing::warn!(error = %err, "token cache write failed");
        }
        tracing::info!(key_id = %credentials.key_id, "minted gateway token");
        Ok(token)
    }
}

/// Builds `header.claims.signature` with only `iss` and `iat` claims.
pub(crate) fn mint_token(
    credentials: &ApnsCredentials,
    now: OffsetDateTime,
) -> Result<String, SigningError> {
    let key_pair = ES256KeyPair::from_pem(&credentials.private_key)
        .map_err(|err| SigningError::InvalidKey(err.to_string()))?
        .with_key_id(&credentials.key_id);

    let issued_at = u64::try_from(now.unix_timestamp()).unwrap_or_default();
    let mut claims = Claims::create(JwtDuration::from_secs(TOKEN_CACHE_TTL.as_secs()))
        .with_issuer(&credentials.team_id);
    claims.issued_at = Some(JwtDuration::from_secs(issued_at));
    claims.expires_at = None;
    claims.invalid_before = None;

    key_pair
        .sign(claims)
        .map_err(|err| SigningError::Sign(err.to_string()))
}

//! JWT verification against a JSON Web Key Set.
//!
//! Keys are fetched from a [`KeySource`] and cached for a fixed TTL. A token
//! whose `kid` is not in the cached set triggers one early refresh (key
//! rotation), rate limited to once per [`MIN_REFRESH_INTERVAL`]. A failed
//! fetch is remembered for the same interval: callers get the previous keys
//! when there are any, otherwise the recorded error, without another fetch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::AuthSettings;
use crate::domain::entities::VerifiedToken;
use crate::domain::token_verifier::{AuthError, TokenVerifier};

/// Accepted signing algorithms.
const SUPPORTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::HS256,
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::ES256,
    Algorithm::ES384,
];

/// Lower bound between two refreshes triggered by unknown key ids.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Where verification keys come from.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// A fixed key set, e.g. keys provisioned out of band.
#[async_trait]
impl KeySource for JwkSet {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        Ok(self.clone())
    }
}

/// Fetches the key set over HTTPS.
pub struct RemoteJwks {
    url: String,
    client: reqwest::Client,
}

impl RemoteJwks {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl KeySource for RemoteJwks {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let keys = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        tracing::debug!(url = %self.url, keys = keys.keys.len(), "Fetched JWKS");
        Ok(keys)
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

struct CachedKeys {
    fetched_at: Instant,
    keys: Arc<JwkSet>,
}

#[derive(Default)]
struct KeyCache {
    current: Option<CachedKeys>,
    last_failure: Option<(Instant, String)>,
}

impl KeyCache {
    fn fresh(&self, max_age: Duration) -> Option<Arc<JwkSet>> {
        self.current
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < max_age)
            .map(|cached| cached.keys.clone())
    }

    /// Outcome to serve while a recent fetch failure is still backing off.
    fn backoff(&self) -> Option<Result<Arc<JwkSet>, AuthError>> {
        let (failed_at, message) = self.last_failure.as_ref()?;
        if failed_at.elapsed() >= MIN_REFRESH_INTERVAL {
            return None;
        }
        Some(match &self.current {
            Some(cached) => Ok(cached.keys.clone()),
            None => Err(AuthError::KeyFetch(message.clone())),
        })
    }

    fn lookup(&self, max_age: Duration) -> Option<Result<Arc<JwkSet>, AuthError>> {
        self.fresh(max_age).map(Ok).or_else(|| self.backoff())
    }
}

/// Verifies signature, expiry and issuer (and audience when configured).
pub struct JwksVerifier {
    source: Arc<dyn KeySource>,
    issuer: String,
    audience: Option<String>,
    leeway_secs: u64,
    cache_ttl: Duration,
    cache: RwLock<KeyCache>,
}

impl JwksVerifier {
    pub fn new(source: Arc<dyn KeySource>, issuer: impl Into<String>) -> Self {
        Self {
            source,
            issuer: issuer.into(),
            audience: None,
            leeway_secs: 30,
            cache_ttl: Duration::from_secs(300),
            cache: RwLock::new(KeyCache::default()),
        }
    }

    /// Builds a verifier that fetches keys from `settings.jwks_url`.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, reqwest::Error> {
        let source = Arc::new(RemoteJwks::new(settings.jwks_url.clone())?);
        Ok(Self::new(source, settings.issuer.clone())
            .with_audience(settings.audience.clone())
            .with_leeway(settings.leeway_secs)
            .with_cache_ttl(Duration::from_secs(settings.jwks_cache_ttl_secs)))
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Returns the cached key set if it is younger than `max_age`, otherwise
    /// refetches. Concurrent refreshes are serialized by the write lock, and
    /// waiters that queued behind a failed fetch reuse its outcome.
    async fn key_set(&self, max_age: Duration) -> Result<Arc<JwkSet>, AuthError> {
        if let Some(outcome) = self.cache.read().await.lookup(max_age) {
            return outcome;
        }

        let mut cache = self.cache.write().await;
        if let Some(outcome) = cache.lookup(max_age) {
            return outcome;
        }

        match self.source.fetch().await {
            Ok(keys) => {
                let keys = Arc::new(keys);
                cache.current = Some(CachedKeys {
                    fetched_at: Instant::now(),
                    keys: keys.clone(),
                });
                cache.last_failure = None;
                Ok(keys)
            }
            Err(e) => {
                cache.last_failure = Some((Instant::now(), e.to_string()));
                match &cache.current {
                    Some(cached) => {
                        tracing::warn!(error = %e, "JWKS refresh failed, keeping previous keys");
                        Ok(cached.keys.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.set_issuer(&[&self.issuer]);
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        validation.leeway = self.leeway_secs;
        if self.audience.is_some() {
            validation.set_required_spec_claims(&["exp", "iss", "sub", "aud"]);
        } else {
            validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        }
        validation
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let header = decode_header(token)?;
        if !SUPPORTED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        let mut keys = self.key_set(self.cache_ttl).await?;
        if keys.find(&kid).is_none() {
            keys = self.key_set(MIN_REFRESH_INTERVAL.min(self.cache_ttl)).await?;
        }
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| AuthError::UnknownKeyId(kid.clone()))?;

        let key = DecodingKey::from_jwk(jwk)?;
        let data = decode::<Claims>(token, &key, &self.validation(header.alg))?;

        Ok(VerifiedToken {
            subject: data.claims.sub,
            email: data.claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SECRET: &[u8] = b"unit-test-signing-secret-32-bytes!!";
    const ISSUER: &str = "https://auth.example.com/auth/v1";

    fn key_set(kid: &str) -> JwkSet {
        serde_json::from_value(json!({
            "keys": [{
                "kty": "oct",
                "kid": kid,
                "alg": "HS256",
                "k": URL_SAFE_NO_PAD.encode(SECRET),
            }]
        }))
        .unwrap()
    }

    fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn sign(kid: Option<&str>, claims: serde_json::Value) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = kid.map(str::to_string);
        encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn valid_claims() -> serde_json::Value {
        json!({
            "sub": "user-1",
            "email": "ada@example.com",
            "iss": ISSUER,
            "exp": now() + 600,
        })
    }

    struct CountingSource {
        calls: AtomicUsize,
        keys: JwkSet,
    }

    #[async_trait]
    impl KeySource for CountingSource {
        async fn fetch(&self) -> Result<JwkSet, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.keys.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl KeySource for FailingSource {
        async fn fetch(&self) -> Result<JwkSet, AuthError> {
            Err(AuthError::KeyFetch("connection refused".into()))
        }
    }

    /// Times out slowly, like an unreachable key endpoint.
    struct SlowFailingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeySource for SlowFailingSource {
        async fn fetch(&self) -> Result<JwkSet, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            Err(AuthError::KeyFetch("timed out".into()))
        }
    }

    /// Serves one key set, then fails every later fetch.
    struct FlakySource {
        calls: AtomicUsize,
        keys: JwkSet,
    }

    #[async_trait]
    impl KeySource for FlakySource {
        async fn fetch(&self) -> Result<JwkSet, AuthError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(self.keys.clone())
            } else {
                Err(AuthError::KeyFetch("connection reset".into()))
            }
        }
    }

    #[tokio::test]
    async fn test_valid_token_is_verified() {
        let verifier = JwksVerifier::new(Arc::new(key_set("k1")), ISSUER);
        let token = sign(Some("k1"), valid_claims());

        let verified = verifier.verify(&token).await.unwrap();
        assert_eq!(verified.subject, "user-1");
        assert_eq!(verified.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let verifier = JwksVerifier::new(Arc::new(key_set("k1")), ISSUER).with_leeway(0);
        let mut claims = valid_claims();
        claims["exp"] = json!(now() - 120);

        let err = verifier.verify(&sign(Some("k1"), claims)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_wrong_issuer_is_rejected() {
        let verifier = JwksVerifier::new(Arc::new(key_set("k1")), ISSUER);
        let mut claims = valid_claims();
        claims["iss"] = json!("https://evil.example.com");

        assert!(verifier.verify(&sign(Some("k1"), claims)).await.is_err());
    }

    #[tokio::test]
    async fn test_signature_mismatch_is_rejected() {
        let verifier = JwksVerifier::new(Arc::new(key_set("k1")), ISSUER);
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("k1".into());
        let token = encode(
            &header,
            &valid_claims(),
            &EncodingKey::from_secret(b"some-other-secret-entirely-000000"),
        )
        .unwrap();

        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_and_kidless_tokens_are_rejected() {
        let verifier = JwksVerifier::new(Arc::new(key_set("k1")), ISSUER);

        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(AuthError::InvalidToken(_))
        ));
        assert!(matches!(
            verifier.verify(&sign(None, valid_claims())).await,
            Err(AuthError::MissingKeyId)
        ));
    }

    #[tokio::test]
    async fn test_audience_is_checked_when_configured() {
        let verifier = JwksVerifier::new(Arc::new(key_set("k1")), ISSUER)
            .with_audience(Some("authenticated".into()));

        assert!(verifier.verify(&sign(Some("k1"), valid_claims())).await.is_err());

        let mut claims = valid_claims();
        claims["aud"] = json!("other-service");
        assert!(verifier.verify(&sign(Some("k1"), claims)).await.is_err());

        let mut claims = valid_claims();
        claims["aud"] = json!("authenticated");
        assert!(verifier.verify(&sign(Some("k1"), claims)).await.is_ok());
    }

    #[tokio::test]
    async fn test_audience_is_optional_when_not_configured() {
        let verifier = JwksVerifier::new(Arc::new(key_set("k1")), ISSUER);

        assert!(verifier.verify(&sign(Some("k1"), valid_claims())).await.is_ok());
    }

    #[tokio::test]
    async fn test_key_fetch_failure_is_an_error() {
        let verifier = JwksVerifier::new(Arc::new(FailingSource), ISSUER);

        assert!(matches!(
            verifier.verify(&sign(Some("k1"), valid_claims())).await,
            Err(AuthError::KeyFetch(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_failed_fetch() {
        let source = Arc::new(SlowFailingSource {
            calls: AtomicUsize::new(0),
        });
        let verifier = JwksVerifier::new(source.clone(), ISSUER);
        let token = sign(Some("k1"), valid_claims());

        let started = Instant::now();
        let results =
            futures_util::future::join_all((0..10).map(|_| verifier.verify(&token))).await;

        assert!(
            results
                .iter()
                .all(|r| matches!(r, Err(AuthError::KeyFetch(_))))
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_keys() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
            keys: key_set("k1"),
        });
        let verifier =
            JwksVerifier::new(source.clone(), ISSUER).with_cache_ttl(Duration::ZERO);
        let token = sign(Some("k1"), valid_claims());

        verifier.verify(&token).await.unwrap();
        verifier.verify(&token).await.unwrap();
        verifier.verify(&token).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_keys_are_cached() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            keys: key_set("k1"),
        });
        let verifier = JwksVerifier::new(source.clone(), ISSUER);
        let token = sign(Some("k1"), valid_claims());

        for _ in 0..3 {
            verifier.verify(&token).await.unwrap();
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_kid_refreshes_at_most_once_per_interval() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            keys: key_set("k1"),
        });
        let verifier = JwksVerifier::new(source.clone(), ISSUER);

        let rotated = sign(Some("k2"), valid_claims());
        assert!(matches!(
            verifier.verify(&rotated).await,
            Err(AuthError::UnknownKeyId(kid)) if kid == "k2"
        ));
        assert!(verifier.verify(&rotated).await.is_err());

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}

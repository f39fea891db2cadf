// ==================== FIREBASE IDENTITY VERIFICATION ====================
// Verifies Firebase ID tokens (RS256 JWTs) against Google's published keys.
// Only the key set is held in memory; every token is verified on every request.

use crate::models::UserProfile;
use crate::utils::error::AppError;
use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const CLOCK_LEEWAY_SECS: u64 = 60;
const DEFAULT_KEYS_TTL: Duration = Duration::from_secs(3600);
const MAX_UID_LEN: usize = 128;
/// Unknown `kid`s refetch the key set at most this often
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Identity attached to an authenticated request
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl AuthUser {
    /// Name shown on reviews: name, then email, then "Anonymous"
    pub fn display_name(&self) -> String {
        fn non_blank(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        non_blank(&self.name)
            .or_else(|| non_blank(&self.email))
            .unwrap_or("Anonymous")
            .to_string()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            display_name: self.name.clone(),
            photo_url: self.picture.clone(),
        }
    }
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, AppError>;
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    iat: u64,
    #[serde(default)]
    auth_time: Option<u64>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

struct CachedKeys {
    jwks: JwkSet,
    expires_at: Instant,
}

#[derive(Default)]
struct KeyCache {
    keys: Option<CachedKeys>,
    /// Last fetch attempt, successful or not
    last_fetch: Option<Instant>,
}

enum KeyLookup {
    Found(Jwk),
    Unknown,
    Refresh,
}

impl KeyCache {
    fn lookup(&self, kid: &str, now: Instant) -> KeyLookup {
        let fresh = self.keys.as_ref().filter(|k| k.expires_at > now);
        if let Some(jwk) = fresh.and_then(|k| k.jwks.find(kid)) {
            return KeyLookup::Found(jwk.clone());
        }

        let throttled = self
            .last_fetch
            .map_or(false, |at| now.duration_since(at) < MIN_REFRESH_INTERVAL);
        if !throttled {
            return KeyLookup::Refresh;
        }

        // Inside the refresh floor a stale key still beats a refetch
        match self.keys.as_ref().and_then(|k| k.jwks.find(kid)) {
            Some(jwk) => KeyLookup::Found(jwk.clone()),
            None => KeyLookup::Unknown,
        }
    }
}

pub struct FirebaseVerifier {
    project_id: String,
    issuer: String,
    keys_url: String,
    http: reqwest::Client,
    keys: RwLock<KeyCache>,
    refresh: Mutex<()>,
}

fn invalid_token() -> AppError {
    AppError::Unauthorized("Token is not valid".to_string())
}

fn unknown_kid(kid: &str) -> AppError {
    log::warn!("⚠️  Token signed with unknown key id: {}", kid);
    invalid_token()
}

impl FirebaseVerifier {
    pub fn new(project_id: &str) -> Self {
        Self::with_keys_url(project_id, GOOGLE_JWKS_URL)
    }

    pub fn with_keys_url(project_id: &str, keys_url: &str) -> Self {
        FirebaseVerifier {
            project_id: project_id.to_string(),
            issuer: format!("{}{}", ISSUER_PREFIX, project_id),
            keys_url: keys_url.to_string(),
            http: reqwest::Client::new(),
            keys: RwLock::new(KeyCache::default()),
            refresh: Mutex::new(()),
        }
    }

    /// Looks up `kid`. A stale set or an unknown kid triggers at most one
    /// fetch per `MIN_REFRESH_INTERVAL`; the cache lock is not held while fetching.
    async fn signing_key(&self, kid: &str) -> Result<Jwk, AppError> {
        let lookup = self.keys.read().await.lookup(kid, Instant::now());
        match lookup {
            KeyLookup::Found(jwk) => return Ok(jwk),
            KeyLookup::Unknown => return Err(unknown_kid(kid)),
            KeyLookup::Refresh => {}
        }

        // One refresh at a time; readers with known kids are not blocked
        let _refreshing = self.refresh.lock().await;

        // Another request may have refreshed while we waited
        let lookup = self.keys.read().await.lookup(kid, Instant::now());
        match lookup {
            KeyLookup::Found(jwk) => return Ok(jwk),
            KeyLookup::Unknown => return Err(unknown_kid(kid)),
            KeyLookup::Refresh => {}
        }

        self.keys.write().await.last_fetch = Some(Instant::now());
        let fresh = self.fetch_keys().await?;
        let jwk = fresh.jwks.find(kid).cloned();
        self.keys.write().await.keys = Some(fresh);

        jwk.ok_or_else(|| unknown_kid(kid))
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, AppError> {
        log::info!("🔑 Fetching Firebase signing keys");

        let response = self
            .http
            .get(&self.keys_url)
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch signing keys: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "Signing key endpoint returned {}",
                response.status()
            )));
        }

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEYS_TTL);

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse signing keys: {}", e)))?;

        log::info!("✅ Loaded {} signing keys (ttl {}s)", jwks.keys.len(), ttl.as_secs());

        Ok(CachedKeys {
            jwks,
            expires_at: Instant::now() + ttl,
        })
    }

    fn decode_claims(&self, token: &str, jwk: &Jwk) -> Result<AuthUser, AppError> {
        let key = DecodingKey::from_jwk(jwk).map_err(|e| {
            log::warn!("⚠️  Unusable signing key: {}", e);
            invalid_token()
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);
        validation.leeway = CLOCK_LEEWAY_SECS;

        let claims = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| {
                log::debug!("Token rejected: {}", e);
                invalid_token()
            })?
            .claims;

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let latest_allowed = now + CLOCK_LEEWAY_SECS;

        if claims.iat > latest_allowed {
            return Err(invalid_token());
        }
        if claims.auth_time.map_or(false, |t| t > latest_allowed) {
            return Err(invalid_token());
        }
        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            return Err(invalid_token());
        }

        Ok(AuthUser {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
        })
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, AppError> {
        let header = decode_header(token).map_err(|_| invalid_token())?;

        if header.alg != Algorithm::RS256 {
            return Err(invalid_token());
        }
        let kid = header.kid.ok_or_else(invalid_token)?;

        let jwk = self.signing_key(&kid).await?;
        self.decode_claims(token, &jwk)
    }
}

/// `public, max-age=19845, must-revalidate, no-transform` -> 19845s
fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}


#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const PROJECT: &str = "binnect-test";
    const KID: &str = "test-key-1";
    const SIGNING_KEY_PEM: &str = include_str!("testdata/signing_key.pem");
    const MODULUS: &str = "r_SFSWaZNJOtgBWTz30TudLgIdJXqasla6eX9NwfnOgMMMXHm1zJoobj5G_Z6uljHrP6gBaKbkx85QEj2-jmAl8Z0yB9NbUtfZ7SNoxXxKf-_fVaK7PPvi29UDQVZ_bRA5SqgA6Xx5eID9Fwp1frZV60F8Sn4Z_Wk8VmjEayqUuurXtlL90YUjt8NJb36gPbuqm4tnRKnG1uQAQ6HaJzG81cxGur-FQLvqqicClmoaeH8u9fqG8svg1hEmgfbVX7WvENrOKZd9xOPJCTPnL0FuzZ_DjZBYxkDT-jUFlxQsW7GkXK37QKc4TbsLWTaVQnq9Oy0nufsHj1MBl0K8orOw";

    fn jwks_json() -> serde_json::Value {
        json!({
            "keys": [{
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "kid": KID,
                "n": MODULUS,
                "e": "AQAB"
            }]
        })
    }

    /// Verifier with freshly loaded keys; a refresh would hit a closed local port
    fn verifier() -> FirebaseVerifier {
        let verifier = FirebaseVerifier::with_keys_url(PROJECT, "http://127.0.0.1:9/keys");
        *verifier.keys.try_write().unwrap() = KeyCache {
            keys: Some(CachedKeys {
                jwks: serde_json::from_value(jwks_json()).unwrap(),
                expires_at: Instant::now() + Duration::from_secs(600),
            }),
            last_fetch: Some(Instant::now()),
        };
        verifier
    }

    /// Serves `body` as the key set on a local port and counts the requests
    fn serve_keys(body: String) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/keys", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);

                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncache-control: public, max-age=3600\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        (url, hits)
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn valid_claims() -> serde_json::Value {
        json!({
            "iss": format!("https://securetoken.google.com/{}", PROJECT),
            "aud": PROJECT,
            "sub": "uid-alice",
            "user_id": "uid-alice",
            "iat": now() - 10,
            "auth_time": now() - 10,
            "exp": now() + 3600,
            "email": "alice@example.com",
            "name": "Alice",
            "picture": "https://example.com/alice.png"
        })
    }

    fn sign(claims: &serde_json::Value, kid: Option<&str>) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(String::from);
        encode(
            &header,
            claims,
            &EncodingKey::from_rsa_pem(SIGNING_KEY_PEM.as_bytes()).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_yields_identity() {
        let token = sign(&valid_claims(), Some(KID));
        let user = verifier().verify(&token).await.unwrap();

        assert_eq!(user.uid, "uid-alice");
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.name.as_deref(), Some("Alice"));
        assert_eq!(user.picture.as_deref(), Some("https://example.com/alice.png"));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let mut claims = valid_claims();
        claims["exp"] = json!(now() - 3600);
        claims["iat"] = json!(now() - 7200);

        let err = verifier().verify(&sign(&claims, Some(KID))).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_wrong_audience_is_rejected() {
        let mut claims = valid_claims();
        claims["aud"] = json!("some-other-project");

        let err = verifier().verify(&sign(&claims, Some(KID))).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_wrong_issuer_is_rejected() {
        let mut claims = valid_claims();
        claims["iss"] = json!("https://accounts.example.com");

        let err = verifier().verify(&sign(&claims, Some(KID))).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_future_issued_at_is_rejected() {
        let mut claims = valid_claims();
        claims["iat"] = json!(now() + 3600);

        let err = verifier().verify(&sign(&claims, Some(KID))).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_tampered_payload_is_rejected() {
        let genuine = sign(&valid_claims(), Some(KID));
        let mut forged_claims = valid_claims();
        forged_claims["sub"] = json!("uid-mallory");
        let forged = sign(&forged_claims, Some(KID));

        // Mallory's payload with Alice's signature
        let genuine_parts: Vec<&str> = genuine.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", genuine_parts[0], forged_parts[1], genuine_parts[2]);

        let err = verifier().verify(&spliced).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_missing_kid_and_garbage_are_rejected() {
        let verifier = verifier();

        let no_kid = sign(&valid_claims(), None);
        assert!(matches!(verifier.verify(&no_kid).await, Err(AppError::Unauthorized(_))));
        assert!(matches!(verifier.verify("not-a-jwt").await, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_unknown_kid_is_rejected_without_refetch() {
        let token = sign(&valid_claims(), Some("rotated-away"));
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_unknown_kids_do_not_hammer_the_key_endpoint() {
        let (url, hits) = serve_keys(jwks_json().to_string());
        let verifier = FirebaseVerifier::with_keys_url(PROJECT, &url);

        let user = verifier.verify(&sign(&valid_claims(), Some(KID))).await.unwrap();
        assert_eq!(user.uid, "uid-alice");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        for i in 0..20 {
            let token = sign(&valid_claims(), Some(&format!("bogus-{}", i)));
            let err = verifier.verify(&token).await.unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Known keys keep working from the cache
        verifier.verify(&sign(&valid_claims(), Some(KID))).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_key_endpoint_is_retried_at_most_once_per_interval() {
        let verifier = FirebaseVerifier::with_keys_url(PROJECT, "http://127.0.0.1:9/keys");

        let first = verifier.verify(&sign(&valid_claims(), Some("bogus-1"))).await.unwrap_err();
        assert!(matches!(first, AppError::Internal(_)));

        for i in 2..10 {
            let token = sign(&valid_claims(), Some(&format!("bogus-{}", i)));
            let err = verifier.verify(&token).await.unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)));
        }
    }

    #[test]
    fn test_parse_max_age() {
        assert_eq!(
            parse_max_age("public, max-age=19845, must-revalidate, no-transform"),
            Some(Duration::from_secs(19845))
        );
        assert_eq!(parse_max_age("no-cache"), None);
        assert_eq!(parse_max_age("max-age=abc"), None);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut user = AuthUser {
            uid: "u".into(),
            email: Some("bob@example.com".into()),
            name: Some("Bob".into()),
            picture: None,
        };
        assert_eq!(user.display_name(), "Bob");

        user.name = Some("   ".into());
        assert_eq!(user.display_name(), "bob@example.com");

        user.name = None;
        assert_eq!(user.display_name(), "bob@example.com");

        user.email = None;
        assert_eq!(user.display_name(), "Anonymous");
    }
}

//! OAuth2 / JWT authentication for Google Cloud APIs.
//!
//! Implements the service-account JWT → access-token exchange flow as
//! documented at:
//! <https://developers.google.com/identity/protocols/oauth2/service-account>
//!
//! 1. Build a JWT signed with the service account's RSA private key
//! 2. POST it to the token endpoint
//! 3. Receive an access token with an expiry
//! 4. Cache the token and refresh before expiry
//!
//! [`AuthClientCache`] builds the [`AuthClient`] at most once per provider.

use crate::credentials::{CredentialMaterial, CredentialSource};
use crate::error::{GcfError, GcfResult};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Scope set requested for every provider.
pub const AUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

const TOKEN_LIFETIME_SECS: i64 = 3600;
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    /// Issuer: the service account email.
    iss: String,
    /// Requested scopes (space-separated).
    scope: String,
    /// Audience: the token endpoint.
    aud: String,
    exp: i64,
    iat: i64,
}

/// An OAuth2 access token with metadata.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
}

impl AccessToken {
    /// Expired, or within 60 s of expiring.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.expires_at - 60
    }
}

/// Authenticated handle shared by every request of one provider.
pub struct AuthClient {
    credentials: CredentialMaterial,
    scopes: Vec<String>,
    http: Client,
    cached_token: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClient")
            .field("client_email", &self.credentials.client_email)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl AuthClient {
    /// Key parsing is deferred to the first token request.
    pub fn new(credentials: CredentialMaterial, scopes: &[&str], http: Client) -> Self {
        Self {
            credentials,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            http,
            cached_token: Mutex::new(None),
        }
    }

    /// Service account the client authenticates as.
    pub fn client_email(&self) -> &str {
        &self.credentials.client_email
    }

    /// Scopes requested with every token.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Get a valid bearer token, refreshing if needed.
    pub async fn access_token(&self) -> GcfResult<String> {
        let mut cached = self.cached_token.lock().await;
        if let Some(ref token) = *cached {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }
        let token = self.fetch_new_token().await?;
        let result = token.token.clone();
        *cached = Some(token);
        Ok(result)
    }

    /// Drop the cached token and fetch a new one.
    pub async fn refresh(&self) -> GcfResult<String> {
        self.cached_token.lock().await.take();
        self.access_token().await
    }

    fn build_assertion(&self, now: i64) -> GcfResult<String> {
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: self.scopes.join(" "),
            aud: self.credentials.token_uri.clone(),
            exp: now + TOKEN_LIFETIME_SECS,
            iat: now,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.credentials.private_key_id.clone();

        // Keys pasted through env vars often carry literal "\n".
        let pem = self.credentials.private_key.replace("\\n", "\n");
        let key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            GcfError::credential_malformed(&format!("Failed to load private key: {}", e))
        })?;

        encode(&header, &claims, &key)
            .map_err(|e| GcfError::credential_malformed(&format!("Failed to encode JWT: {}", e)))
    }

    async fn fetch_new_token(&self) -> GcfResult<AccessToken> {
        let now = Utc::now().timestamp();
        let assertion = self.build_assertion(now)?;
        log::debug!("Requesting access token for {}", self.credentials.client_email);

        let form = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];
        let response = self
            .http
            .post(&self.credentials.token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| GcfError::network("oauth2", &format!("Token exchange request failed: {}", e)))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(GcfError::from_api_response("oauth2", status, &body));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: Option<i64>,
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            GcfError::network("oauth2", &format!("Failed to parse token response: {}", e))
        })?;

        Ok(AccessToken {
            token: token.access_token,
            expires_at: now + token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS),
        })
    }
}

/// Compute-once cell holding the provider's [`AuthClient`].
///
/// A failed construction leaves the cell empty; the error goes to the caller.
pub struct AuthClientCache {
    source: Box<dyn CredentialSource>,
    http: Client,
    cell: OnceCell<Arc<AuthClient>>,
}

impl AuthClientCache {
    /// Create an empty cache reading from `source`.
    pub fn new(source: Box<dyn CredentialSource>, http: Client) -> Self {
        Self {
            source,
            http,
            cell: OnceCell::new(),
        }
    }

    /// Return the cached client, building it on first use.
    pub async fn get(&self) -> GcfResult<Arc<AuthClient>> {
        let client = self
            .cell
            .get_or_try_init(|| async {
                let credentials = self.source.load()?;
                log::info!("Authenticating as {}", credentials.client_email);
                Ok::<_, GcfError>(Arc::new(AuthClient::new(
                    credentials,
                    AUTH_SCOPES,
                    self.http.clone(),
                )))
            })
            .await?;
        Ok(Arc::clone(client))
    }

    /// Whether the client has been built.
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GcfErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        reads: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CredentialSource for CountingSource {
        fn load(&self) -> GcfResult<CredentialMaterial> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GcfError::credential_not_found("/missing.json", "No such file"));
            }
            CredentialMaterial::from_json(r#"{"client_email": "foo@bar.de","private_key": "wasdqwerty"}"#)
        }
    }

    fn cache(fail: bool) -> (AuthClientCache, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            reads: Arc::clone(&reads),
            fail,
        };
        (AuthClientCache::new(Box::new(source), Client::new()), reads)
    }

    #[tokio::test]
    async fn builds_client_once() {
        let (cache, reads) = cache(false);
        assert!(!cache.is_initialized());

        let first = cache.get().await.unwrap();
        let second = cache.get().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(cache.is_initialized());
        assert_eq!(first.client_email(), "foo@bar.de");
        assert_eq!(
            first.scopes().to_vec(),
            vec!["https://www.googleapis.com/auth/cloud-platform".to_string()]
        );
    }

    #[tokio::test]
    async fn credential_failure_propagates_and_is_not_cached() {
        let (cache, reads) = cache(true);
        let err = cache.get().await.unwrap_err();
        assert_eq!(err.kind, GcfErrorKind::CredentialNotFound);
        assert!(!cache.is_initialized());

        let _ = cache.get().await.unwrap_err();
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn bad_private_key_fails_before_network() {
        let (cache, _) = cache(false);
        let client = cache.get().await.unwrap();
        let err = client.access_token().await.unwrap_err();
        assert_eq!(err.kind, GcfErrorKind::CredentialMalformed);
        assert!(err.message.contains("private key"));
    }

    #[test]
    fn token_expiry_buffer() {
        let now = Utc::now().timestamp();
        let fresh = AccessToken {
            token: "t".to_string(),
            expires_at: now + 3600,
        };
        let stale = AccessToken {
            token: "t".to_string(),
            expires_at: now + 30,
        };
        assert!(!fresh.is_expired());
        assert!(stale.is_expired());
    }

    #[test]
    fn debug_hides_key_material() {
        let material =
            CredentialMaterial::from_json(r#"{"client_email": "a@b.c","private_key": "secret"}"#)
                .unwrap();
        let client = AuthClient::new(material, AUTH_SCOPES, Client::new());
        let dbg = format!("{:?}", client);
        assert!(dbg.contains("a@b.c"));
        assert!(!dbg.contains("secret"));
    }
}

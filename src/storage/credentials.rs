use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{RecorderError, Result};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Only files created by the bot are visible to it
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for service-account assertions
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Seconds of slack before expiry at which the token is refreshed anyway
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<OAuthClient>,
    web: Option<OAuthClient>,
}

#[derive(Debug, Clone, Deserialize)]
struct OAuthClient {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

#[derive(Debug)]
enum ClientSecrets {
    OAuth(OAuthClient),
    ServiceAccount(ServiceAccountKey),
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Cached OAuth token, persisted next to the client secrets
///
/// Uses the authorized-user layout (`token`, `expiry`); fields written by
/// other tools (`client_id`, `scopes`, ...) are kept as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CachedToken {
    #[serde(default, rename = "token", alias = "access_token")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, rename = "expiry", alias = "expires_at")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CachedToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(expires_at)) => now + Duration::seconds(EXPIRY_MARGIN_SECS) < expires_at,
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

enum Grant {
    /// Installed/web OAuth client plus a refresh token from token.json
    Authorized {
        client: OAuthClient,
        token_path: PathBuf,
    },
    /// Service account signing its own JWT-bearer assertions
    ServiceAccount {
        email: String,
        key_id: Option<String>,
        token_uri: String,
        signing_key: EncodingKey,
    },
}

/// Google Drive credentials with an access-token cache
pub struct DriveCredentials {
    grant: Grant,
    token: Mutex<CachedToken>,
    http: reqwest::Client,
}

impl DriveCredentials {
    /// Load a service-account key, or OAuth client secrets plus the cached
    /// token. First-time consent is not handled here; a missing token file
    /// surfaces as [`RecorderError::Credential`].
    pub fn load(credentials_path: &Path, token_path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(credentials_path).map_err(|e| {
            RecorderError::Credential(format!(
                "cannot read credentials {}: {}",
                credentials_path.display(),
                e
            ))
        })?;

        match parse_client_secrets(&raw)? {
            ClientSecrets::ServiceAccount(key) => Self::service_account(key),
            ClientSecrets::OAuth(client) => Self::authorized(client, token_path),
        }
    }

    fn service_account(key: ServiceAccountKey) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            RecorderError::Credential(format!(
                "invalid private key for {}: {}",
                key.client_email, e
            ))
        })?;

        info!("Using service account {}", key.client_email);

        Ok(Self {
            grant: Grant::ServiceAccount {
                email: key.client_email,
                key_id: key.private_key_id,
                token_uri: key.token_uri,
                signing_key,
            },
            token: Mutex::new(CachedToken::default()),
            http: reqwest::Client::new(),
        })
    }

    fn authorized(client: OAuthClient, token_path: &Path) -> Result<Self> {
        let raw_token = std::fs::read_to_string(token_path).map_err(|e| {
            RecorderError::Credential(format!(
                "no cached token at {} ({}); authorize once and place token.json there",
                token_path.display(),
                e
            ))
        })?;
        let token: CachedToken = serde_json::from_str(&raw_token).map_err(|e| {
            RecorderError::Credential(format!("invalid token file {}: {}", token_path.display(), e))
        })?;
        if token.refresh_token.is_none() {
            return Err(RecorderError::Credential(format!(
                "token file {} has no refresh_token",
                token_path.display()
            )));
        }

        Ok(Self {
            grant: Grant::Authorized {
                client,
                token_path: token_path.to_path_buf(),
            },
            token: Mutex::new(token),
            http: reqwest::Client::new(),
        })
    }

    /// A valid access token, fetching and caching a new one when needed
    pub async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if token.is_fresh(Utc::now()) {
            if let Some(access) = &token.access_token {
                return Ok(access.clone());
            }
        }

        info!("Refreshing Google Drive access token");

        let refreshed = match &self.grant {
            Grant::Authorized { client, .. } => {
                let refresh_token = token.refresh_token.clone().unwrap_or_default();
                self.request_token(
                    &client.token_uri,
                    &[
                        ("grant_type", "refresh_token"),
                        ("client_id", client.client_id.as_str()),
                        ("client_secret", client.client_secret.as_str()),
                        ("refresh_token", refresh_token.as_str()),
                    ],
                )
                .await?
            }
            Grant::ServiceAccount { token_uri, .. } => {
                let assertion = self.assertion(Utc::now())?;
                self.request_token(
                    token_uri,
                    &[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())],
                )
                .await?
            }
        };

        token.access_token = Some(refreshed.access_token.clone());
        token.expires_at = Some(Utc::now() + Duration::seconds(refreshed.expires_in));

        if let Grant::Authorized { token_path, .. } = &self.grant {
            let serialized = serde_json::to_string_pretty(&*token)
                .map_err(|e| RecorderError::Credential(format!("cannot serialize token: {}", e)))?;
            tokio::fs::write(token_path, serialized).await?;
        }

        Ok(refreshed.access_token)
    }

    async fn request_token(&self, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| RecorderError::Credential(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RecorderError::Credential(format!("token request failed: {}", e)))?;
        if !status.is_success() {
            return Err(RecorderError::Credential(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| RecorderError::Credential(format!("bad token response: {}", e)))
    }

    /// Signed JWT for the service-account grant
    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let Grant::ServiceAccount {
            email,
            key_id,
            token_uri,
            signing_key,
        } = &self.grant
        else {
            return Err(RecorderError::Credential(
                "not a service account".to_string(),
            ));
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = key_id.clone();

        let claims = AssertionClaims {
            iss: email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        };

        jsonwebtoken::encode(&header, &claims, signing_key)
            .map_err(|e| RecorderError::Credential(format!("cannot sign assertion: {}", e)))
    }
}

fn parse_client_secrets(raw: &str) -> Result<ClientSecrets> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| RecorderError::Credential(format!("invalid credentials file: {}", e)))?;

    if value.get("type").and_then(|t| t.as_str()) == Some("service_account") {
        let key: ServiceAccountKey = serde_json::from_value(value).map_err(|e| {
            RecorderError::Credential(format!("invalid service account key: {}", e))
        })?;
        return Ok(ClientSecrets::ServiceAccount(key));
    }

    let file: ClientSecretsFile = serde_json::from_value(value)
        .map_err(|e| RecorderError::Credential(format!("invalid credentials file: {}", e)))?;

    file.installed
        .or(file.web)
        .map(ClientSecrets::OAuth)
        .ok_or_else(|| RecorderError::Credential("unsupported credentials type".to_string()))
}

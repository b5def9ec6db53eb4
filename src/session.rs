use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub username: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct TokenClaims {
    username: Option<String>,
    exp: Option<i64>,
}

impl Session {
    pub fn from_token(token: impl Into<String>) -> Self {
        let token = token.into().trim().to_string();
        let claims = decode_claims(&token);
        Self {
            username: claims.as_ref().and_then(|claims| claims.username.clone()),
            expires_at: claims
                .and_then(|claims| claims.exp)
                .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0)),
            token,
        }
    }

    // Same leniency as the service: the `Bearer ` prefix is optional.
    pub fn from_authorization(header: &str) -> Option<Self> {
        let header = header.trim();
        let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
        if token.is_empty() || token.contains(char::is_whitespace) {
            return None;
        }
        Some(Self::from_token(token))
    }

    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|expires| expires <= now).unwrap_or(false)
    }
}

fn decode_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to access session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse session file: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<Session>, SessionError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(&self.path).await?;
        if data.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&data)?))
    }

    pub async fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let payload = serde_json::to_string_pretty(session)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, payload).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        tracing::debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    pub async fn clear(&self) -> Result<bool, SessionError> {
        if !self.path.exists() {
            return Ok(false);
        }
        tokio::fs::remove_file(&self.path).await?;
        Ok(true)
    }
}

//! Session identity — a pseudo-random number per browser, kept in a signed
//! `connections` cookie and used only to pick the browser's colour.
//!
//! Cookie value: `<id>.<sig>` where `sig` is the base64url Ed25519 signature
//! of `connections:<id>` under the server's session key.

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use rand::Rng;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::VoidError;
use crate::types::IDENTITY_SPACE;

pub const COOKIE_NAME: &str = "connections";

/// Signing seed used when no `SESSION_SECRET` is configured. Stable across
/// restarts, but public: deployments should set their own secret.
const DEVELOPMENT_SEED: [u8; 32] = *b"voidd development session key v1";

/// Identity resolved for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionIdentity {
    pub id: u32,
    /// Issued on this request; the response must set the cookie.
    pub fresh: bool,
}

pub struct SessionKeys {
    key: SigningKey,
    max_age: u64,
    secure: bool,
}

impl SessionKeys {
    /// Build from `SESSION_SECRET`, or the built-in development key if none
    /// is configured.
    pub fn from_config(config: &Config) -> Result<Self, VoidError> {
        let seed: [u8; 32] = match &config.session_secret {
            Some(secret) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(secret.trim())
                    .map_err(|e| VoidError::Config(format!("SESSION_SECRET is not base64: {e}")))?;
                bytes.try_into().map_err(|b: Vec<u8>| {
                    VoidError::Config(format!("SESSION_SECRET must be 32 bytes, got {}", b.len()))
                })?
            }
            None => {
                warn!("SESSION_SECRET not set, signing sessions with the built-in development key");
                DEVELOPMENT_SEED
            }
        };
        Ok(Self {
            key: SigningKey::from_bytes(&seed),
            max_age: config.session_max_age,
            secure: config.cookie_secure,
        })
    }

    /// Resolve the caller's identity. A request without a session cookie is
    /// issued a new identity; a session cookie that does not verify is an error.
    pub fn identity_for(&self, headers: &HeaderMap) -> Result<SessionIdentity, VoidError> {
        for header in headers.get_all(COOKIE) {
            let header = header
                .to_str()
                .map_err(|e| VoidError::Session(format!("unreadable cookie header: {e}")))?;
            let Some(value) = find_cookie(header, COOKIE_NAME) else {
                continue;
            };
            let id = self.verify(value).ok_or_else(|| {
                VoidError::Session(format!("failed to decode {COOKIE_NAME} cookie"))
            })?;
            return Ok(SessionIdentity { id, fresh: false });
        }

        let id = rand::thread_rng().gen_range(0..IDENTITY_SPACE);
        debug!(session_id = id, "issued new session identity");
        Ok(SessionIdentity { id, fresh: true })
    }

    /// `Set-Cookie` header value carrying `identity`.
    pub fn set_cookie(&self, identity: SessionIdentity) -> Result<HeaderValue, VoidError> {
        let mut cookie = format!(
            "{COOKIE_NAME}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.sign(identity.id),
            self.max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
            .map_err(|e| VoidError::Session(format!("failed to save session: {e}")))
    }

    fn sign(&self, id: u32) -> String {
        let sig = self.key.sign(signed_payload(id).as_bytes());
        format!("{id}.{}", URL_SAFE_NO_PAD.encode(sig.to_bytes()))
    }

    fn verify(&self, value: &str) -> Option<u32> {
        let (id, sig) = value.split_once('.')?;
        let id: u32 = id.parse().ok()?;
        let sig = URL_SAFE_NO_PAD.decode(sig).ok()?;
        let sig = Signature::from_slice(&sig).ok()?;
        self.key
            .verifying_key()
            .verify(signed_payload(id).as_bytes(), &sig)
            .ok()?;
        (id < IDENTITY_SPACE).then_some(id)
    }
}

fn signed_payload(id: u32) -> String {
    format!("{COOKIE_NAME}:{id}")
}

/// Value of cookie `name` in a `Cookie` header, if present.
fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.trim_matches('"'))
    })
}

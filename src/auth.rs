//! Admin credential checks: the shared password and the signed session tokens
//! handed out by `POST /api/admin/login`.

use actix_web::{http::header, HttpRequest};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::{AppConfig, MAX_SESSION_TTL_MINUTES};
use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AdminAuth {
    password: Option<String>,
    secret: Vec<u8>,
    ttl: Duration,
}

impl AdminAuth {
    pub fn new(password: Option<String>, secret: Option<String>, ttl_minutes: i64) -> Self {
        let secret = match secret {
            Some(secret) => secret.into_bytes(),
            None => {
                log::info!("ADMIN_SESSION_SECRET not set, sessions end on restart");
                rand::thread_rng().gen::<[u8; 32]>().to_vec()
            }
        };

        Self {
            password,
            secret,
            ttl: Duration::minutes(ttl_minutes.clamp(1, MAX_SESSION_TTL_MINUTES)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.admin_password.clone(),
            config.admin_session_secret.clone(),
            config.admin_session_ttl_minutes,
        )
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }

    /// Constant-time comparison against the configured password. Always false when
    /// no password is configured.
    pub fn verify_password(&self, candidate: &str) -> bool {
        let Some(password) = self.password.as_deref() else {
            return false;
        };

        let mut expected = self.mac();
        expected.update(b"admin-password:");
        expected.update(password.as_bytes());
        let expected = expected.finalize().into_bytes();

        let mut actual = self.mac();
        actual.update(b"admin-password:");
        actual.update(candidate.as_bytes());
        actual.verify_slice(&expected).is_ok()
    }

    pub fn issue_session(&self) -> AdminSession {
        self.issue_session_at(Utc::now())
    }

    pub fn issue_session_at(&self, now: DateTime<Utc>) -> AdminSession {
        let expires_at = now + self.ttl;
        let expires = expires_at.timestamp();
        let signature = URL_SAFE_NO_PAD.encode(self.sign(expires));

        AdminSession {
            token: format!("{expires}.{signature}"),
            expires_at: Utc.timestamp_opt(expires, 0).single().unwrap_or(expires_at),
        }
    }

    pub fn verify_session(&self, token: &str) -> bool {
        self.verify_session_at(token, Utc::now())
    }

    pub fn verify_session_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        if self.password.is_none() {
            return false;
        }
        let Some((expires, signature)) = token.trim().split_once('.') else {
            return false;
        };
        let Ok(expires) = expires.parse::<i64>() else {
            return false;
        };
        if expires <= now.timestamp() {
            return false;
        }
        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };

        let mut mac = self.mac();
        mac.update(format!("admin-session:{expires}").as_bytes());
        mac.verify_slice(&signature).is_ok()
    }

    fn sign(&self, expires: i64) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(format!("admin-session:{expires}").as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Accepts a bearer session token or the legacy `password` body field.
    pub fn authorize(&self, req: &HttpRequest, password: Option<&str>) -> Result<(), ApiError> {
        let bearer = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));

        if let Some(token) = bearer {
            if self.verify_session(token) {
                return Ok(());
            }
        }
        if let Some(password) = password {
            if self.verify_password(password) {
                return Ok(());
            }
        }

        log::warn!("Rejected admin request to {}", req.path());
        Err(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    fn auth() -> AdminAuth {
        AdminAuth::new(Some("tet2025".into()), Some("secret".into()), 60)
    }

    #[test]
    fn password_check() {
        let auth = auth();
        assert!(auth.verify_password("tet2025"));
        assert!(!auth.verify_password("tet2024"));
        assert!(!auth.verify_password(""));

        let unconfigured = AdminAuth::new(None, None, 60);
        assert!(!unconfigured.verify_password(""));
    }

    #[test]
    fn session_tokens_expire_and_resist_tampering() {
        let auth = auth();
        let now = Utc::now();
        let session = auth.issue_session_at(now);

        assert!(auth.verify_session_at(&session.token, now));
        assert!(!auth.verify_session_at(&session.token, now + Duration::minutes(61)));

        let (expires, signature) = session.token.split_once('.').unwrap();
        let forged = format!("{}.{}", expires.parse::<i64>().unwrap() + 3600, signature);
        assert!(!auth.verify_session_at(&forged, now));
        assert!(!auth.verify_session_at("garbage", now));

        let other = AdminAuth::new(Some("tet2025".into()), Some("other".into()), 60);
        assert!(!other.verify_session_at(&session.token, now));
    }

    #[test]
    fn authorize_accepts_bearer_or_password() {
        let auth = auth();
        let session = auth.issue_session();

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", session.token)))
            .to_http_request();
        assert!(auth.authorize(&req, None).is_ok());

        let req = TestRequest::default().to_http_request();
        assert!(auth.authorize(&req, Some("tet2025")).is_ok());
        assert!(matches!(
            auth.authorize(&req, Some("nope")),
            Err(ApiError::Unauthorized)
        ));
        assert!(auth.authorize(&req, None).is_err());
    }

    #[test]
    fn oversized_ttl_is_clamped_instead_of_overflowing() {
        let auth = AdminAuth::new(Some("tet2025".into()), Some("secret".into()), i64::MAX);
        let now = Utc::now();
        let session = auth.issue_session_at(now);
        assert_eq!(
            session.expires_at.timestamp(),
            (now + Duration::minutes(MAX_SESSION_TTL_MINUTES)).timestamp()
        );
        assert!(auth.verify_session_at(&session.token, now));
    }
}

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Session tokens expire one hour after issue.
pub const TOKEN_TTL_SECS: i64 = 3600;

const TOKEN_HEADER: &[u8] = br#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String, // user | driver | admin
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Issue a signed session token embedding the user's role claim.
pub fn issue_token(user_id: &str, role: &str, secret: &str) -> String {
    issue_token_at(user_id, role, secret, chrono::Utc::now().timestamp())
}

fn issue_token_at(user_id: &str, role: &str, secret: &str, iat: i64) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        iat,
        exp: iat + TOKEN_TTL_SECS,
    };

    let header = URL_SAFE_NO_PAD.encode(TOKEN_HEADER);
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).expect("claims are serializable"));
    let signing_input = format!("{}.{}", header, payload);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{}.{}", signing_input, signature)
}

/// Verify a session token's signature and expiry, returning its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut segments = token.split('.');
    let (header, payload, signature) = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(h), Some(p), Some(s), None) => (h, p, s),
        _ => return Err(TokenError::Malformed),
    };

    let signing_input = format!("{}.{}", header, payload);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(signing_input.as_bytes());

    let given = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| TokenError::Malformed)?;
    mac.verify_slice(&given)
        .map_err(|_| TokenError::BadSignature)?;

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| TokenError::Malformed)?;
    let claims: Claims =
        serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::Malformed)?;

    if claims.exp <= chrono::Utc::now().timestamp() {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_roundtrip_preserves_claims() {
        let token = issue_token("user-42", "driver", SECRET);
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "user-42");
        assert_eq!(claims.role, "driver");
        assert_eq!(claims.exp, claims.iat + TOKEN_TTL_SECS);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token("user-42", "admin", SECRET);
        assert!(matches!(
            verify_token(&token, "other-secret"),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = issue_token("user-42", "user", SECRET);
        let mut parts: Vec<&str> = token.split('.').collect();
        // Swap in a payload claiming the admin role
        let forged = URL_SAFE_NO_PAD.encode(
            br#"{"sub":"user-42","role":"admin","iat":0,"exp":9999999999}"#,
        );
        parts[1] = &forged;
        let forged_token = parts.join(".");
        assert!(matches!(
            verify_token(&forged_token, SECRET),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Issued far enough in the past that the TTL has elapsed
        let iat = chrono::Utc::now().timestamp() - TOKEN_TTL_SECS - 10;
        let token = issue_token_at("user-42", "user", SECRET, iat);
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            verify_token("not-a-token", SECRET),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            verify_token("a.b", SECRET),
            Err(TokenError::Malformed)
        ));
    }
}

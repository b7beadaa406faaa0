//! Webhook signature verification

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, error};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_ALGORITHM: &str = "sha256";

/// Verifies a GitHub `X-Hub-Signature-256` header value against the raw body.
///
/// The header is expected as `sha256=<hex>`. Anything malformed (wrong number
/// of `=`-separated parts, unknown algorithm, bad hex) is simply rejected.
/// The digest comparison goes through `Mac::verify_slice`, which is constant-time.
pub fn verify_signature(payload: &[u8], secret: &str, signature_header: &str) -> bool {
    let parts: Vec<&str> = signature_header.split('=').collect();
    let [algorithm, presented] = parts.as_slice() else {
        debug!("Signature header has {} parts, expected 2", parts.len());
        return false;
    };
    if *algorithm != SIGNATURE_ALGORITHM {
        debug!("Unsupported signature algorithm {:?}", algorithm);
        return false;
    }

    let presented = match hex::decode(presented) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Signature is not valid hex: {}", e);
            return false;
        }
    };

    let Some(mut mac) = keyed_mac(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&presented).is_ok()
}

fn keyed_mac(secret: &str) -> Option<HmacSha256> {
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => Some(mac),
        Err(e) => {
            error!("Could not key HMAC: {}", e);
            None
        }
    }
}

/// Lowercase hex HMAC-SHA256 of `payload` keyed with `secret`.
pub fn hmac_sha256_hex(payload: &[u8], secret: &str) -> Option<String> {
    let mut mac = keyed_mac(secret)?;
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Renders the header value a sender holding `secret` would attach.
pub fn sign(payload: &[u8], secret: &str) -> Option<String> {
    hmac_sha256_hex(payload, secret).map(|digest| format!("{}={}", SIGNATURE_ALGORITHM, digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"ref":"refs/heads/main","repository":{"full_name":"org/repo"}}"#;

    #[test]
    fn accepts_own_signature() {
        assert!(verify_signature(BODY, "abc", &sign(BODY, "abc").unwrap()));
    }

    #[test]
    fn accepts_empty_body_and_empty_secret() {
        assert!(verify_signature(b"", "", &sign(b"", "").unwrap()));
    }

    #[test]
    fn known_vector() {
        assert_eq!(
            hmac_sha256_hex(b"The quick brown fox jumps over the lazy dog", "key").unwrap(),
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn rejects_mutated_payload() {
        let signature = sign(BODY, "abc").unwrap();
        for i in 0..BODY.len() {
            let mut mutated = BODY.to_vec();
            mutated[i] ^= 0x01;
            assert!(!verify_signature(&mutated, "abc", &signature), "byte {i}");
        }
    }

    #[test]
    fn rejects_wrong_secret() {
        let signature = sign(BODY, "abc").unwrap();
        assert!(!verify_signature(BODY, "abd", &signature));
        assert!(!verify_signature(BODY, "", &signature));
        assert!(!verify_signature(BODY, "abcd", &signature));
    }

    #[test]
    fn rejects_mutated_signature() {
        let signature = sign(BODY, "abc").unwrap();
        let hex_start = "sha256=".len();
        for i in hex_start..signature.len() {
            let mut chars: Vec<char> = signature.chars().collect();
            chars[i] = if chars[i] == '0' { '1' } else { '0' };
            let mutated: String = chars.into_iter().collect();
            assert!(!verify_signature(BODY, "abc", &mutated), "char {i}");
        }
    }

    #[test]
    fn rejects_malformed_headers() {
        let digest = hmac_sha256_hex(BODY, "abc").unwrap();
        assert!(!verify_signature(BODY, "abc", ""));
        assert!(!verify_signature(BODY, "abc", &digest));
        assert!(!verify_signature(BODY, "abc", "sha256="));
        assert!(!verify_signature(BODY, "abc", &format!("sha256={digest}=")));
        assert!(!verify_signature(BODY, "abc", &format!("sha1={digest}")));
        assert!(!verify_signature(BODY, "abc", "sha256=not-hex"));
        assert!(!verify_signature(BODY, "abc", &format!("sha256={}", &digest[..10])));
    }
}

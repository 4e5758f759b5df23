//! HMAC-SHA256 verification of core hub deliveries.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

fn keyed(secret: &str) -> Result<HmacSha256, InvalidLength> {
    HmacSha256::new_from_slice(secret.as_bytes())
}

/// Computes the signature header value for `body`: `"sha256=" + hex(hmac)`.
///
/// # Errors
///
/// Returns [`InvalidLength`] if the MAC rejects the key.
pub fn sign(body: &[u8], secret: &str) -> Result<String, InvalidLength> {
    let mut mac = keyed(secret)?;
    mac.update(body);
    Ok(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verifies `signature` against the exact raw `body`.
///
/// Returns `false` for a missing header, a missing prefix, invalid hex or a
/// digest of the wrong length. The digest comparison is constant-time.
#[must_use]
pub fn verify(body: &[u8], signature: Option<&str>, secret: &str) -> bool {
    let Some(hex_digest) = signature.and_then(|s| s.trim().strip_prefix(SIGNATURE_PREFIX)) else {
        return false;
    };
    let Ok(provided) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = keyed(secret) else {
        return false;
    };

    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "supersecret123";
    const BODY: &[u8] = br#"{"destination":{"channel":"payments.approved"}}"#;

    #[test]
    fn test_accepts_correct_signature() {
        let signature = sign(BODY, SECRET).unwrap();

        assert!(signature.starts_with(SIGNATURE_PREFIX));
        assert_eq!(signature.len(), SIGNATURE_PREFIX.len() + 64);
        assert!(verify(BODY, Some(&signature), SECRET));
    }

    #[test]
    fn test_rejects_every_single_byte_mutation_of_signature() {
        let signature = sign(BODY, SECRET).unwrap();

        for i in SIGNATURE_PREFIX.len()..signature.len() {
            let mut mutated = signature.clone().into_bytes();
            mutated[i] = if mutated[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(mutated).unwrap();
            assert!(!verify(BODY, Some(&mutated), SECRET), "accepted mutation at {i}");
        }
    }

    #[test]
    fn test_rejects_every_single_byte_mutation_of_body() {
        let signature = sign(BODY, SECRET).unwrap();

        for i in 0..BODY.len() {
            let mut body = BODY.to_vec();
            body[i] ^= 0x01;
            assert!(!verify(&body, Some(&signature), SECRET), "accepted mutation at {i}");
        }
    }

    #[test]
    fn test_rejects_malformed_headers() {
        let signature = sign(BODY, SECRET).unwrap();
        let bare_hex = signature.trim_start_matches(SIGNATURE_PREFIX);

        assert!(!verify(BODY, None, SECRET));
        assert!(!verify(BODY, Some(""), SECRET));
        assert!(!verify(BODY, Some(bare_hex), SECRET));
        assert!(!verify(BODY, Some("sha256=not-hex"), SECRET));
        assert!(!verify(BODY, Some(&signature[..signature.len() - 2]), SECRET));
        assert!(!verify(BODY, Some(&format!("{signature}00")), SECRET));
    }

    #[test]
    fn test_rejects_signature_made_with_another_secret() {
        let signature = sign(BODY, "other-secret").unwrap();

        assert!(!verify(BODY, Some(&signature), SECRET));
    }

    #[test]
    fn test_signs_with_empty_and_oversized_secrets() {
        let long_secret = "k".repeat(200);

        let empty = sign(BODY, "").unwrap();
        let long = sign(BODY, &long_secret).unwrap();

        assert!(verify(BODY, Some(&empty), ""));
        assert!(verify(BODY, Some(&long), &long_secret));
        assert_ne!(empty, long);
    }
}

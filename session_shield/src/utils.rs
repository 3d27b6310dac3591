use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::rand::SecureRandom;
use thiserror::Error;

pub(crate) fn base64url_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| UtilError::Format("Failed to decode base64url".to_string()))
}

pub(crate) fn gen_random_bytes(len: usize) -> Result<Vec<u8>, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|_| UtilError::Crypto("Failed to generate random bytes".to_string()))?;
    Ok(bytes)
}

/// `len` random bytes, base64url encoded without padding.
pub(crate) fn gen_random_string(len: usize) -> Result<String, UtilError> {
    Ok(base64url_encode(&gen_random_bytes(len)?))
}

/// `len` random bytes, lowercase hex encoded.
pub(crate) fn gen_random_hex(len: usize) -> Result<String, UtilError> {
    Ok(hex::encode(gen_random_bytes(len)?))
}

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid format: {0}")]
    Format(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_random_string_length() {
        // 32 bytes encode to 43 base64url characters without padding
        let s = gen_random_string(32).unwrap();
        assert_eq!(s.len(), 43);
        assert!(
            s.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_gen_random_hex_is_lowercase_hex() {
        let s = gen_random_hex(32).unwrap();
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn test_random_values_differ() {
        assert_ne!(gen_random_hex(32).unwrap(), gen_random_hex(32).unwrap());
        assert_ne!(gen_random_string(32).unwrap(), gen_random_string(32).unwrap());
    }

    #[test]
    fn test_base64url_round_trip_and_rejection() {
        let encoded = base64url_encode(b"session");
        assert_eq!(base64url_decode(&encoded).unwrap(), b"session");
        assert!(matches!(
            base64url_decode("not*base64"),
            Err(UtilError::Format(_))
        ));
    }
}

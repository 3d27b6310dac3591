use http::HeaderMap;

use crate::session::types::TransportState;

pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Decide whether the request arrived over a secure transport.
///
/// `X-Forwarded-Proto` is client-controllable. It only selects cookie
/// attributes and must never feed an authorization decision.
pub fn inspect_transport(native_secure: bool, headers: &HeaderMap) -> TransportState {
    if native_secure {
        return TransportState { is_secure: true };
    }

    // A proxy chain may append values; the first one is the client-facing hop.
    let forwarded_https = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
        .unwrap_or(false);

    if forwarded_https {
        tracing::debug!("Secure transport detected via {}", X_FORWARDED_PROTO);
    }

    TransportState {
        is_secure: forwarded_https,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_no_signal_is_insecure() {
        assert!(!inspect_transport(false, &HeaderMap::new()).is_secure);
    }

    #[test]
    fn test_native_tls_is_secure() {
        assert!(inspect_transport(true, &HeaderMap::new()).is_secure);
        assert!(inspect_transport(true, &forwarded("http")).is_secure);
    }

    #[test]
    fn test_forwarded_https_is_secure() {
        assert!(inspect_transport(false, &forwarded("https")).is_secure);
        assert!(inspect_transport(false, &forwarded("HTTPS")).is_secure);
        assert!(inspect_transport(false, &forwarded(" https , http")).is_secure);
    }

    #[test]
    fn test_forwarded_other_values_are_insecure() {
        for value in ["http", "", "httpss", "http, https", "wss"] {
            assert!(!inspect_transport(false, &forwarded(value)).is_secure, "{value}");
        }
    }

    #[test]
    fn test_non_utf8_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_PROTO,
            HeaderValue::from_bytes(b"\xffhttps").unwrap(),
        );
        assert!(!inspect_transport(false, &headers).is_secure);
    }
}

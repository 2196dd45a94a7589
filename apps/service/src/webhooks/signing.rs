use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the raw request body
pub const SIGNATURE_HEADER: &str = "X-Uppe-Signature";

/// Header carrying the event type of a delivery
pub const EVENT_HEADER: &str = "X-Uppe-Event";

/// User agent of every webhook delivery
pub const WEBHOOK_USER_AGENT: &str = "Uppe-Webhooks/1.0";

fn mac(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

/// Sign the exact bytes that go on the wire
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac = mac(secret);
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a received signature against the raw body, in constant time
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };

    let mut mac = mac(secret);
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let signature = sign_payload("Jefe", b"what do ya want for nothing?");
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_round_trip() {
        let body = br#"{"event":"site.down","data":{}}"#;
        let signature = sign_payload("s3cret", body);

        assert!(verify_signature("s3cret", body, &signature));
        assert!(!verify_signature("other", body, &signature));
        assert!(!verify_signature("s3cret", b"tampered", &signature));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(!verify_signature("s3cret", b"{}", "not-hex"));
        assert!(!verify_signature("s3cret", b"{}", ""));
    }
}

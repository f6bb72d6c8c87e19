//! Partner API request signing.
//!
//! Requests carry an HMAC-SHA256 signature over the concatenation of
//! `partner_id + path + timestamp + access_token + shop_id`, hex-encoded.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The exact string the vendor signs.
pub(crate) fn base_string(
    partner_id: i64,
    path: &str,
    timestamp: i64,
    access_token: &str,
    shop_id: i64,
) -> String {
    format!("{partner_id}{path}{timestamp}{access_token}{shop_id}")
}

/// Hex-encoded HMAC-SHA256 signature for one request.
pub fn sign_request(
    partner_key: &[u8],
    partner_id: i64,
    path: &str,
    timestamp: i64,
    access_token: &str,
    shop_id: i64,
) -> String {
    let mut mac =
        HmacSha256::new_from_slice(partner_key).expect("HMAC accepts keys of any length");
    mac.update(base_string(partner_id, path, timestamp, access_token, shop_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_string_concatenates_in_contract_order() {
        assert_eq!(
            base_string(2012161, "/api/v2/product/get_model_list", 1700000000, "tok", 99),
            "2012161/api/v2/product/get_model_list1700000000tok99"
        );
    }

    #[test]
    fn signature_is_hex_sha256_length() {
        let sig = sign_request(b"secret", 1, "/p", 2, "t", 3);
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_is_deterministic_and_input_sensitive() {
        let a = sign_request(b"secret", 1, "/p", 2, "t", 3);
        let b = sign_request(b"secret", 1, "/p", 2, "t", 3);
        assert_eq!(a, b);

        assert_ne!(a, sign_request(b"other", 1, "/p", 2, "t", 3));
        assert_ne!(a, sign_request(b"secret", 1, "/q", 2, "t", 3));
        assert_ne!(a, sign_request(b"secret", 1, "/p", 3, "t", 3));
        assert_ne!(a, sign_request(b"secret", 1, "/p", 2, "t", 4));
    }
}

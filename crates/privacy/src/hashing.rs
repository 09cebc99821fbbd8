use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Privacy-preserving hash used for window IDs, resource IDs, and any
/// payload field listed in `hash_keys`. Keyed on the configured salt so
/// the same raw value always hashes to the same token within one
/// installation but cannot be correlated across installations.
pub fn hmac_sha256(value: &str, salt: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(salt.as_bytes()).expect("HMAC accepts any key length");
    mac.update(value.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_and_salt_hash_identically() {
        assert_eq!(hmac_sha256("window-42", "salt"), hmac_sha256("window-42", "salt"));
    }

    #[test]
    fn different_salts_produce_different_hashes() {
        assert_ne!(hmac_sha256("window-42", "salt-a"), hmac_sha256("window-42", "salt-b"));
    }
}

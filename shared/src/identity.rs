//! Offline-mode player identities.

use md5::{Digest, Md5};
use uuid::Uuid;

/// Derives the offline-mode UUID for `username`.
///
/// This is a name-based version 3 UUID over `"OfflinePlayer:" + username`
/// without a namespace, matching what vanilla servers hand out when online
/// authentication is disabled. The same name always maps to the same UUID.
pub fn offline_uuid(username: &str) -> Uuid {
    let digest = Md5::digest(format!("OfflinePlayer:{}", username).as_bytes());

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    bytes[6] = (bytes[6] & 0x0F) | 0x30;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;

    Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_offline_uuids() {
        assert_eq!(
            offline_uuid("Notch").to_string(),
            "b50ad385-829d-3141-a216-7e7d7539ba7f"
        );
        assert_eq!(
            offline_uuid("Steve").to_string(),
            "5627dd98-e6be-3c21-b8a8-e92344183641"
        );
        assert_eq!(
            offline_uuid("jeb_").to_string(),
            "a762f560-4fce-3236-812a-b80efff0b62b"
        );
    }

    #[test]
    fn test_version_and_variant_bits() {
        let id = offline_uuid("anyone");
        assert_eq!(id.get_version_num(), 3);
        assert_eq!(id.get_variant(), uuid::Variant::RFC4122);
    }

    #[test]
    fn test_deterministic_and_distinct() {
        assert_eq!(offline_uuid("alice"), offline_uuid("alice"));
        assert_ne!(offline_uuid("alice"), offline_uuid("Alice"));
        assert_ne!(offline_uuid("alice"), offline_uuid("bob"));
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(
            offline_uuid("").to_string(),
            "fc5bc365-aedf-30a8-8b89-04e462e29bde"
        );
    }
}

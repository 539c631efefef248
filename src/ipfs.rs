//! IPFS content references.
//!
//! The service never fetches from IPFS itself; pinning happens in the
//! client before the vault is registered. We validate that a stored
//! reference at least looks like a CID and hand unlocked callers a set
//! of public gateway URLs to fetch through.

/// Public gateways, in the order callers should try them.
pub const IPFS_GATEWAYS: &[&str] = &[
    "https://ipfs.io/ipfs/",
    "https://gateway.pinata.cloud/ipfs/",
    "https://cloudflare-ipfs.com/ipfs/",
    "https://dweb.link/ipfs/",
];

pub fn gateway_urls(ipfs_hash: &str) -> Vec<String> {
    IPFS_GATEWAYS
        .iter()
        .map(|gateway| format!("{}{}", gateway, ipfs_hash))
        .collect()
}

/// CIDv0 (`Qm` + 44 base58 chars) or CIDv1 (`bafy` + 55 base32 chars).
pub fn is_valid_ipfs_hash(hash: &str) -> bool {
    fn is_base58(c: char) -> bool {
        c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
    }
    fn is_base32(c: char) -> bool {
        matches!(c, 'a'..='z' | '2'..='7')
    }

    if let Some(rest) = hash.strip_prefix("Qm") {
        rest.len() == 44 && rest.chars().all(is_base58)
    } else if let Some(rest) = hash.strip_prefix("bafy") {
        rest.len() == 55 && rest.chars().all(is_base32)
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID_V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
    const CID_V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn test_accepts_cid_v0_and_v1() {
        assert!(is_valid_ipfs_hash(CID_V0));
        assert!(is_valid_ipfs_hash(CID_V1));
    }

    #[test]
    fn test_rejects_malformed_hashes() {
        assert!(!is_valid_ipfs_hash(""));
        assert!(!is_valid_ipfs_hash("Qmshort"));
        // Right length, forbidden base58 characters.
        assert!(!is_valid_ipfs_hash(
            "Qm0000000000000000000000000000000000000000000O"
        ));
        assert!(!is_valid_ipfs_hash("bafyNOTBASE32"));
        assert!(!is_valid_ipfs_hash("0x1234567890abcdef"));
    }

    #[test]
    fn test_gateway_urls_cover_every_gateway() {
        let urls = gateway_urls(CID_V0);
        assert_eq!(urls.len(), IPFS_GATEWAYS.len());
        assert!(urls[0].ends_with(CID_V0));
        assert!(urls.iter().all(|u| u.starts_with("https://")));
    }
}

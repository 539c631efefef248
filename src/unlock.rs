//! Unlock state machine.
//!
//! A vault is `LOCKED` until wall-clock time reaches its unlock
//! timestamp, then `UNLOCKED` forever; there is no re-lock path. Two
//! triggers apply the transition: the persisted sweep (see
//! [`crate::database::VaultDatabase::unlock_due_vaults`]) and the
//! per-read derived view computed here. Until the sweep runs, the
//! stored status column can lag the derived value; the derived value
//! is authoritative for display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VaultStatus {
    Locked,
    Unlocked,
}

impl VaultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultStatus::Locked => "LOCKED",
            VaultStatus::Unlocked => "UNLOCKED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LOCKED" => Some(VaultStatus::Locked),
            "UNLOCKED" => Some(VaultStatus::Unlocked),
            _ => None,
        }
    }
}

impl fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    Created,
    Viewed,
    Unlocked,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Created => "CREATED",
            AccessType::Viewed => "VIEWED",
            AccessType::Unlocked => "UNLOCKED",
        }
    }
}

/// How the requesting address relates to a vault. `None` from
/// [`resolve_role`] means the request must be rejected with 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerRole {
    Owner,
    Nominee,
}

/// True once the unlock timestamp has passed. The boundary is
/// inclusive: a vault unlocks at exactly its unlock time.
pub fn is_due(unlock_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= unlock_time
}

/// The display status derived from wall-clock time, independent of the
/// persisted column.
pub fn derive_status(unlock_time: DateTime<Utc>, now: DateTime<Utc>) -> VaultStatus {
    if is_due(unlock_time, now) {
        VaultStatus::Unlocked
    } else {
        VaultStatus::Locked
    }
}

/// Milliseconds until unlock, clamped at zero once due.
pub fn time_remaining_ms(unlock_time: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (unlock_time - now).num_milliseconds().max(0)
}

pub fn format_time_remaining(ms: i64) -> String {
    if ms <= 0 {
        return "Unlocked now!".to_string();
    }
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    if minutes > 0 {
        format!("{}m {}s remaining", minutes, seconds)
    } else {
        format!("{}s remaining", seconds)
    }
}

pub fn resolve_role(owner_id: &str, nominee_ids: &[String], user_id: &str) -> Option<ViewerRole> {
    if owner_id == user_id {
        Some(ViewerRole::Owner)
    } else if nominee_ids.iter().any(|id| id == user_id) {
        Some(ViewerRole::Nominee)
    } else {
        None
    }
}

/// Outcome of a decrypt request, checked before touching the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptEligibility {
    Eligible,
    NotNominee,
    /// Rejection carries the unlock time so the caller can surface it.
    StillLocked(DateTime<Utc>),
}

/// Decrypt requires nominee role and a due unlock time; owners do not
/// get decrypt access through this path.
pub fn decrypt_eligibility(
    nominee_addresses: &[String],
    caller_address: &str,
    unlock_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DecryptEligibility {
    let caller = caller_address.trim().to_lowercase();
    if !nominee_addresses.iter().any(|a| a.to_lowercase() == caller) {
        return DecryptEligibility::NotNominee;
    }
    if !is_due(unlock_time, now) {
        return DecryptEligibility::StillLocked(unlock_time);
    }
    DecryptEligibility::Eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_status_round_trip() {
        for status in [VaultStatus::Locked, VaultStatus::Unlocked] {
            assert_eq!(VaultStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(VaultStatus::parse("locked"), None);
        assert_eq!(VaultStatus::parse(""), None);
    }

    #[test]
    fn test_derive_status_boundary_is_inclusive() {
        let unlock_time = at(1_000);
        assert_eq!(derive_status(unlock_time, at(999)), VaultStatus::Locked);
        assert_eq!(derive_status(unlock_time, at(1_000)), VaultStatus::Unlocked);
        assert_eq!(derive_status(unlock_time, at(1_001)), VaultStatus::Unlocked);
    }

    #[test]
    fn test_unlocked_at_satisfies_invariant() {
        // The sweep stamps unlocked_at = now and only fires once due,
        // so unlocked_at >= unlock_time must hold for any due instant.
        let unlock_time = at(1_000);
        for now in [at(1_000), at(1_500), at(100_000)] {
            assert!(is_due(unlock_time, now));
            let unlocked_at = now;
            assert!(unlocked_at >= unlock_time);
        }
    }

    #[test]
    fn test_time_remaining_clamps_at_zero() {
        let unlock_time = at(1_000);
        assert_eq!(time_remaining_ms(unlock_time, at(900)), 100_000);
        assert_eq!(time_remaining_ms(unlock_time, at(1_000)), 0);
        assert_eq!(time_remaining_ms(unlock_time, at(2_000)), 0);
    }

    #[test]
    fn test_format_time_remaining() {
        assert_eq!(format_time_remaining(0), "Unlocked now!");
        assert_eq!(format_time_remaining(45_000), "45s remaining");
        assert_eq!(format_time_remaining(61_000), "1m 1s remaining");
        assert_eq!(format_time_remaining(600_500), "10m 0s remaining");
    }

    #[test]
    fn test_resolve_role() {
        let nominees = vec!["n1".to_string(), "n2".to_string()];
        assert_eq!(
            resolve_role("owner", &nominees, "owner"),
            Some(ViewerRole::Owner)
        );
        assert_eq!(
            resolve_role("owner", &nominees, "n2"),
            Some(ViewerRole::Nominee)
        );
        assert_eq!(resolve_role("owner", &nominees, "stranger"), None);
    }

    #[test]
    fn test_decrypt_rejects_non_nominee() {
        let nominees = vec!["0xabc".to_string()];
        let unlock_time = at(1_000);
        assert_eq!(
            decrypt_eligibility(&nominees, "0xdef", unlock_time, at(2_000)),
            DecryptEligibility::NotNominee
        );
    }

    #[test]
    fn test_decrypt_rejects_locked_vault_naming_unlock_time() {
        let nominees = vec!["0xabc".to_string()];
        let unlock_time = at(1_000);
        assert_eq!(
            decrypt_eligibility(&nominees, "0xABC", unlock_time, at(500)),
            DecryptEligibility::StillLocked(unlock_time)
        );
    }

    #[test]
    fn test_decrypt_succeeds_after_unlock_time() {
        let nominees = vec!["0xabc".to_string()];
        let unlock_time = at(1_000);
        assert_eq!(
            decrypt_eligibility(&nominees, "0xAbC", unlock_time, at(1_000)),
            DecryptEligibility::Eligible
        );
    }
}

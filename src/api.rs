//! HTTP routes for the vault API.
//!
//! Responses carry the wall-clock-derived status, not the persisted
//! column, so callers see a vault as unlocked the moment its time
//! passes even if the sweep has not caught up yet.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::database::{normalize_address, NewVault};
use crate::entity::{user, vault};
use crate::error::ApiError;
use crate::ipfs;
use crate::monitoring;
use crate::stats;
use crate::unlock::{
    decrypt_eligibility, derive_status, format_time_remaining, resolve_role, time_remaining_ms,
    AccessType, DecryptEligibility, VaultStatus, ViewerRole,
};
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/vaults", get(list_vaults).post(create_vault))
        .route("/api/vaults/summary", get(vaults_summary))
        .route("/api/vaults/unlock-check", get(unlock_check))
        .route("/api/vaults/decrypt", post(decrypt_vault))
        .route("/api/vaults/:id", get(get_vault).put(update_vault))
        .route("/health_check", get(health_check))
        .route("/stats", get(stats::stats))
        .route("/metrics", get(monitoring::metrics_handler))
        .with_state(state)
}

#[derive(Debug, Clone, Serialize)]
pub struct AddressRef {
    pub address: String,
}

/// A vault as returned to an authorized viewer, with the derived
/// status fields alongside the stored record.
#[derive(Debug, Serialize)]
pub struct VaultView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub file_hash: Option<String>,
    pub ipfs_hash: Option<String>,
    pub unlock_time: DateTime<Utc>,
    pub status: VaultStatus,
    pub is_unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub time_remaining: i64,
    pub time_remaining_formatted: String,
    pub encrypted_data: Option<String>,
    pub blockchain_id: Option<String>,
    pub owner: AddressRef,
    pub nominees: Vec<AddressRef>,
    pub user_role: ViewerRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The stored record plus its people, for responses that do not have a
/// requesting viewer (sweep results, status updates).
#[derive(Debug, Serialize)]
pub struct VaultRecord {
    #[serde(flatten)]
    pub vault: vault::Model,
    pub owner: AddressRef,
    pub nominees: Vec<AddressRef>,
}

/// What a nominee may see of a still-locked vault in the summary.
#[derive(Debug, Serialize)]
pub struct LockedSummary {
    pub id: String,
    pub owner: AddressRef,
    pub unlocks_on: DateTime<Utc>,
}

fn address_refs(users: &[user::Model]) -> Vec<AddressRef> {
    users
        .iter()
        .map(|user| AddressRef {
            address: user.address.clone(),
        })
        .collect()
}

fn vault_view(
    vault: &vault::Model,
    owner: &user::Model,
    nominees: &[user::Model],
    user_role: ViewerRole,
    last_viewed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> VaultView {
    let status = derive_status(vault.unlock_time, now);
    let time_remaining = time_remaining_ms(vault.unlock_time, now);
    VaultView {
        id: vault.id.clone(),
        title: vault.title.clone(),
        description: vault.description.clone(),
        file_name: vault.file_name.clone(),
        file_type: vault.file_type.clone(),
        file_size: vault.file_size,
        file_hash: vault.file_hash.clone(),
        ipfs_hash: vault.ipfs_hash.clone(),
        unlock_time: vault.unlock_time,
        status,
        is_unlocked: status == VaultStatus::Unlocked,
        unlocked_at: vault.unlocked_at,
        time_remaining,
        time_remaining_formatted: format_time_remaining(time_remaining),
        encrypted_data: vault.encrypted_data.clone(),
        blockchain_id: vault.blockchain_id.clone(),
        owner: AddressRef {
            address: owner.address.clone(),
        },
        nominees: address_refs(nominees),
        user_role,
        last_viewed_at,
        created_at: vault.created_at,
        updated_at: vault.updated_at,
    }
}

fn locked_summary(vault: &vault::Model, owner: &user::Model) -> LockedSummary {
    LockedSummary {
        id: vault.id.clone(),
        owner: AddressRef {
            address: owner.address.clone(),
        },
        unlocks_on: vault.unlock_time,
    }
}

fn required_address(address: Option<&str>) -> Result<String, ApiError> {
    match address {
        Some(a) if !a.trim().is_empty() => Ok(normalize_address(a)),
        _ => Err(ApiError::bad_request("Address is required")),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub list_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVaultRequest {
    pub owner_address: Option<String>,
    pub description: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub file_hash: Option<String>,
    pub ipfs_hash: Option<String>,
    #[serde(default)]
    pub nominees: Vec<String>,
    pub unlock_time: Option<DateTime<Utc>>,
    pub blockchain_id: Option<String>,
    pub encrypted_data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVaultRequest {
    pub status: Option<String>,
    pub unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct DecryptRequest {
    pub vault_id: Option<String>,
    pub user_address: Option<String>,
}

/// POST /api/vaults
async fn create_vault(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateVaultRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let owner_address = request.owner_address.filter(|a| !a.trim().is_empty());
    let description = request.description.filter(|d| !d.trim().is_empty());
    let nominees: Vec<String> = request
        .nominees
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();

    let (Some(owner_address), Some(description), Some(unlock_time)) =
        (owner_address, description, request.unlock_time)
    else {
        return Err(ApiError::bad_request("Missing required fields"));
    };
    if nominees.is_empty() {
        return Err(ApiError::bad_request("Missing required fields"));
    }
    if let Some(hash) = &request.ipfs_hash {
        if !ipfs::is_valid_ipfs_hash(hash) {
            return Err(ApiError::bad_request("Invalid IPFS hash"));
        }
    }

    let created = state
        .db
        .create_vault(NewVault {
            owner_address,
            description,
            file_name: request.file_name,
            file_type: request.file_type,
            file_size: request.file_size,
            file_hash: request.file_hash,
            ipfs_hash: request.ipfs_hash,
            nominees,
            unlock_time,
            blockchain_id: request.blockchain_id,
            encrypted_data: request.encrypted_data,
        })
        .await?;
    monitoring::record_vault_created();

    let view = vault_view(
        &created.vault,
        &created.owner,
        &created.nominees,
        ViewerRole::Owner,
        None,
        Utc::now(),
    );
    Ok((StatusCode::CREATED, Json(json!({ "vault": view }))))
}

/// GET /api/vaults?address=&type=
async fn list_vaults(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = required_address(query.address.as_deref())?;
    let user = state.db.get_or_create_user(&address).await?;

    let vaults = match query.list_type.as_deref() {
        Some("owner") => state.db.vaults_owned_by(&user.id).await?,
        Some("nominee") => state.db.vaults_for_nominee(&user.id).await?,
        _ => {
            let mut both = state.db.vaults_owned_by(&user.id).await?;
            both.extend(state.db.vaults_for_nominee(&user.id).await?);
            both
        }
    };

    let now = Utc::now();
    let mut views = Vec::with_capacity(vaults.len());
    for vault in &vaults {
        let owner = state.db.owner_of(vault).await?;
        let nominees = state.db.nominees_of(&vault.id).await?;
        let last_viewed_at = state.db.last_viewed_at(&vault.id).await?;
        let role = if vault.owner_id == user.id {
            ViewerRole::Owner
        } else {
            ViewerRole::Nominee
        };
        views.push(vault_view(vault, &owner, &nominees, role, last_viewed_at, now));
    }
    Ok(Json(json!({ "vaults": views })))
}

/// GET /api/vaults/:id?address=
async fn get_vault(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = required_address(query.address.as_deref())?;
    let vault = state
        .db
        .vault_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vault not found"))?;
    let user = state
        .db
        .find_user(&address)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let nominees = state.db.nominees_of(&vault.id).await?;
    let nominee_ids: Vec<String> = nominees.iter().map(|n| n.id.clone()).collect();
    let Some(role) = resolve_role(&vault.owner_id, &nominee_ids, &user.id) else {
        monitoring::record_access_denied();
        return Err(ApiError::forbidden("Access denied"));
    };

    state
        .db
        .record_access(&vault.id, &user.id, AccessType::Viewed)
        .await?;

    let owner = state.db.owner_of(&vault).await?;
    let access_logs = state.db.recent_access_logs(&vault.id, 10).await?;
    let view = vault_view(&vault, &owner, &nominees, role, None, Utc::now());
    Ok(Json(json!({ "vault": view, "access_logs": access_logs })))
}

/// PUT /api/vaults/:id
async fn update_vault(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateVaultRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status_raw = request
        .status
        .ok_or_else(|| ApiError::bad_request("Status is required"))?;
    let status = VaultStatus::parse(&status_raw)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown status: {}", status_raw)))?;

    let existing = state
        .db
        .vault_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vault not found"))?;

    // UNLOCKED is terminal.
    if VaultStatus::parse(&existing.status) == Some(VaultStatus::Unlocked)
        && status == VaultStatus::Locked
    {
        return Err(ApiError::bad_request(
            "Vault is already unlocked and cannot be re-locked",
        ));
    }

    let unlocked_at = match (status, request.unlocked_at) {
        // Stamp the transition time so unlocked_at >= unlock_time holds.
        (VaultStatus::Unlocked, None) => Some(Utc::now()),
        (_, explicit) => explicit,
    };

    let updated = state
        .db
        .update_vault_status(&id, status, unlocked_at)
        .await?
        .ok_or_else(|| ApiError::not_found("Vault not found"))?;
    let owner = state.db.owner_of(&updated).await?;
    let nominees = state.db.nominees_of(&updated.id).await?;

    let record = VaultRecord {
        vault: updated,
        owner: AddressRef {
            address: owner.address,
        },
        nominees: address_refs(&nominees),
    };
    Ok(Json(json!({ "vault": record })))
}

/// GET /api/vaults/summary?address=
async fn vaults_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = required_address(query.address.as_deref())?;
    let user = state.db.get_or_create_user(&address).await?;
    let now = Utc::now();

    let mut my_vaults = Vec::new();
    for vault in &state.db.vaults_owned_by(&user.id).await? {
        let owner = state.db.owner_of(vault).await?;
        let nominees = state.db.nominees_of(&vault.id).await?;
        my_vaults.push(vault_view(
            vault,
            &owner,
            &nominees,
            ViewerRole::Owner,
            None,
            now,
        ));
    }

    let mut locked = Vec::new();
    let mut unlocked = Vec::new();
    for vault in &state.db.vaults_for_nominee(&user.id).await? {
        let owner = state.db.owner_of(vault).await?;
        if derive_status(vault.unlock_time, now) == VaultStatus::Unlocked {
            let nominees = state.db.nominees_of(&vault.id).await?;
            unlocked.push(vault_view(
                vault,
                &owner,
                &nominees,
                ViewerRole::Nominee,
                None,
                now,
            ));
        } else {
            // Locked vaults are redacted for nominees.
            locked.push(locked_summary(vault, &owner));
        }
    }

    Ok(Json(json!({
        "vaults_shared_with_me": { "locked": locked, "unlocked": unlocked },
        "my_vaults": my_vaults,
    })))
}

/// GET /api/vaults/unlock-check
async fn unlock_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    monitoring::record_sweep_run();
    let unlocked = state.db.unlock_due_vaults(Utc::now()).await?;
    if unlocked.is_empty() {
        return Ok(Json(json!({ "unlocked_vaults": [] })));
    }

    monitoring::record_vaults_unlocked(unlocked.len() as u64);
    info!("Unlocked {} vaults", unlocked.len());

    let records: Vec<VaultRecord> = unlocked
        .into_iter()
        .map(|entry| VaultRecord {
            vault: entry.vault,
            owner: AddressRef {
                address: entry.owner.address,
            },
            nominees: address_refs(&entry.nominees),
        })
        .collect();
    let message = format!("Successfully unlocked {} vaults", records.len());
    Ok(Json(json!({ "unlocked_vaults": records, "message": message })))
}

/// POST /api/vaults/decrypt
async fn decrypt_vault(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DecryptRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let vault_id = request.vault_id.filter(|v| !v.trim().is_empty());
    let user_address = request.user_address.filter(|a| !a.trim().is_empty());
    let (Some(vault_id), Some(user_address)) = (vault_id, user_address) else {
        return Err(ApiError::bad_request(
            "Vault ID and user address are required",
        ));
    };

    let vault = state
        .db
        .vault_by_id(&vault_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vault not found"))?;
    let nominees = state.db.nominees_of(&vault.id).await?;
    let nominee_addresses: Vec<String> = nominees.iter().map(|n| n.address.clone()).collect();

    match decrypt_eligibility(
        &nominee_addresses,
        &user_address,
        vault.unlock_time,
        Utc::now(),
    ) {
        DecryptEligibility::NotNominee => {
            monitoring::record_access_denied();
            return Err(ApiError::forbidden(
                "Access denied. You are not a nominee for this vault.",
            ));
        }
        DecryptEligibility::StillLocked(unlock_time) => {
            return Err(ApiError::bad_request(format!(
                "Vault is still locked. Unlocks at {}",
                unlock_time.to_rfc3339()
            )));
        }
        DecryptEligibility::Eligible => {}
    }

    if vault.encrypted_data.is_none() {
        return Err(ApiError::bad_request(
            "No encrypted data found for this vault",
        ));
    }
    if vault.blockchain_id.is_none() {
        return Err(ApiError::bad_request(
            "No blockchain ID found for this vault. Cannot decrypt.",
        ));
    }

    let owner = state.db.owner_of(&vault).await?;
    let caller = state
        .db
        .find_user(&user_address)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    state
        .db
        .record_access(&vault.id, &caller.id, AccessType::Unlocked)
        .await?;
    info!("Vault {} decrypted for nominee {}", vault.id, caller.address);

    let file_gateway_urls = vault.ipfs_hash.as_deref().map(ipfs::gateway_urls);
    Ok(Json(json!({
        "success": true,
        "vault": {
            "id": vault.id,
            "description": vault.description,
            "file_name": vault.file_name,
            "file_type": vault.file_type,
            "file_size": vault.file_size,
            "file_hash": vault.file_hash,
            "ipfs_hash": vault.ipfs_hash,
            "file_gateway_urls": file_gateway_urls,
            "unlock_time": vault.unlock_time,
            "owner": owner.address,
        }
    })))
}

/// GET /health_check
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn test_user(id: &str, address: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            address: address.to_string(),
            created_at: at(0),
        }
    }

    fn test_vault(unlock_time: DateTime<Utc>, status: &str) -> vault::Model {
        vault::Model {
            id: "v1".to_string(),
            title: "will".to_string(),
            description: "will and testament".to_string(),
            file_name: None,
            file_type: None,
            file_size: None,
            file_hash: None,
            ipfs_hash: None,
            unlock_time,
            status: status.to_string(),
            unlocked_at: None,
            encrypted_data: Some("0xcipher".to_string()),
            blockchain_id: Some("42".to_string()),
            owner_id: "u1".to_string(),
            created_at: at(0),
            updated_at: at(0),
        }
    }

    #[test]
    fn test_view_derives_status_over_stale_column() {
        // Stored LOCKED but the unlock time has passed: the derived
        // view must win.
        let vault = test_vault(at(1_000), "LOCKED");
        let owner = test_user("u1", "0xowner");
        let view = vault_view(&vault, &owner, &[], ViewerRole::Owner, None, at(2_000));
        assert_eq!(view.status, VaultStatus::Unlocked);
        assert!(view.is_unlocked);
        assert_eq!(view.time_remaining, 0);
        assert_eq!(view.time_remaining_formatted, "Unlocked now!");
    }

    #[test]
    fn test_view_before_unlock_time_is_locked() {
        let vault = test_vault(at(120_000), "LOCKED");
        let owner = test_user("u1", "0xowner");
        let nominees = vec![test_user("u2", "0xnominee")];
        let view = vault_view(
            &vault,
            &owner,
            &nominees,
            ViewerRole::Nominee,
            None,
            at(60_000),
        );
        assert_eq!(view.status, VaultStatus::Locked);
        assert!(!view.is_unlocked);
        assert_eq!(view.time_remaining, 60_000_000);
        assert!(view.time_remaining_formatted.ends_with("remaining"));
        assert_eq!(view.nominees.len(), 1);
        assert_eq!(view.nominees[0].address, "0xnominee");
    }

    #[test]
    fn test_locked_summary_redacts_everything_but_owner_and_time() {
        let vault = test_vault(at(1_000), "LOCKED");
        let owner = test_user("u1", "0xowner");
        let value = serde_json::to_value(locked_summary(&vault, &owner)).unwrap();
        let object = value.as_object().unwrap();
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["id", "owner", "unlocks_on"]);
        assert_eq!(value["owner"]["address"], "0xowner");
    }

    #[test]
    fn test_required_address() {
        assert_eq!(required_address(Some("0xAbC")).unwrap(), "0xabc");
        assert!(required_address(Some("   ")).is_err());
        assert!(required_address(None).is_err());
    }
}

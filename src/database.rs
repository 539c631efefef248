//! Sea-ORM access layer for vaults, users and the audit trail.
//!
//! Users are created lazily on first reference. The sweep
//! ([`VaultDatabase::unlock_due_vaults`]) commits each vault's
//! transition in its own transaction: a crash mid-sweep can leave a
//! subset of due vaults updated, which is safe because the next run
//! picks up the rest.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::{access_log, user, vault, vault_nominee};
use crate::unlock::{AccessType, VaultStatus};

/// Wallet addresses are compared and stored lowercase.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Vault titles are the first 50 characters of the description.
pub fn title_from_description(description: &str) -> String {
    description.chars().take(50).collect()
}

/// Everything needed to register a vault after its on-chain submission
/// succeeded.
#[derive(Debug, Clone)]
pub struct NewVault {
    pub owner_address: String,
    pub description: String,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub file_hash: Option<String>,
    pub ipfs_hash: Option<String>,
    pub nominees: Vec<String>,
    pub unlock_time: DateTime<Utc>,
    pub blockchain_id: Option<String>,
    pub encrypted_data: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedVault {
    pub vault: vault::Model,
    pub owner: user::Model,
    pub nominees: Vec<user::Model>,
}

/// A vault the sweep just flipped, with the people attached to it.
#[derive(Debug, Clone)]
pub struct UnlockedVault {
    pub vault: vault::Model,
    pub owner: user::Model,
    pub nominees: Vec<user::Model>,
}

#[derive(Debug, Clone, Copy)]
pub struct StoreCounts {
    pub locked_vaults: u64,
    pub unlocked_vaults: u64,
    pub users: u64,
    pub access_logs: u64,
}

pub struct VaultDatabase {
    connection: DatabaseConnection,
}

impl VaultDatabase {
    pub async fn new(database_url: &str) -> Result<Self> {
        info!("Connecting to database");
        let connection = Database::connect(database_url).await?;
        Ok(Self { connection })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub async fn find_user(&self, address: &str) -> Result<Option<user::Model>> {
        let address = normalize_address(address);
        Ok(user::Entity::find()
            .filter(user::Column::Address.eq(address))
            .one(&self.connection)
            .await?)
    }

    pub async fn get_or_create_user(&self, address: &str) -> Result<user::Model> {
        let address = normalize_address(address);
        if let Some(existing) = self.find_user(&address).await? {
            return Ok(existing);
        }
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            address: Set(address.clone()),
            created_at: Set(Utc::now()),
        };
        match model.insert(&self.connection).await {
            Ok(created) => {
                debug!("Created user for address {}", created.address);
                Ok(created)
            }
            // Lost a create race on the unique address index.
            Err(err) => match self.find_user(&address).await? {
                Some(existing) => Ok(existing),
                None => Err(err.into()),
            },
        }
    }

    /// Inserts the vault, its nominee memberships and the `CREATED`
    /// audit row in one transaction. Owner and nominee users are
    /// created lazily beforehand.
    pub async fn create_vault(&self, new: NewVault) -> Result<CreatedVault> {
        let owner = self.get_or_create_user(&new.owner_address).await?;
        let mut nominees: Vec<user::Model> = Vec::with_capacity(new.nominees.len());
        for address in &new.nominees {
            let nominee = self.get_or_create_user(address).await?;
            if !nominees.iter().any(|existing| existing.id == nominee.id) {
                nominees.push(nominee);
            }
        }

        let now = Utc::now();
        let model = vault::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            title: Set(title_from_description(&new.description)),
            description: Set(new.description),
            file_name: Set(new.file_name),
            file_type: Set(new.file_type),
            file_size: Set(new.file_size),
            file_hash: Set(new.file_hash),
            ipfs_hash: Set(new.ipfs_hash),
            unlock_time: Set(new.unlock_time),
            status: Set(VaultStatus::Locked.as_str().to_string()),
            unlocked_at: Set(None),
            encrypted_data: Set(new.encrypted_data),
            blockchain_id: Set(new.blockchain_id),
            owner_id: Set(owner.id.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let txn = self.connection.begin().await?;
        let vault = model.insert(&txn).await?;

        let memberships: Vec<vault_nominee::ActiveModel> = nominees
            .iter()
            .map(|nominee| vault_nominee::ActiveModel {
                vault_id: Set(vault.id.clone()),
                user_id: Set(nominee.id.clone()),
            })
            .collect();
        if !memberships.is_empty() {
            vault_nominee::Entity::insert_many(memberships)
                .exec(&txn)
                .await?;
        }

        access_log::ActiveModel {
            id: NotSet,
            vault_id: Set(vault.id.clone()),
            user_id: Set(owner.id.clone()),
            access_type: Set(AccessType::Created.as_str().to_string()),
            timestamp: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        debug!("Created vault {} for owner {}", vault.id, owner.address);
        Ok(CreatedVault {
            vault,
            owner,
            nominees,
        })
    }

    pub async fn vault_by_id(&self, id: &str) -> Result<Option<vault::Model>> {
        Ok(vault::Entity::find_by_id(id).one(&self.connection).await?)
    }

    pub async fn vaults_owned_by(&self, user_id: &str) -> Result<Vec<vault::Model>> {
        Ok(vault::Entity::find()
            .filter(vault::Column::OwnerId.eq(user_id))
            .order_by_desc(vault::Column::CreatedAt)
            .all(&self.connection)
            .await?)
    }

    pub async fn vaults_for_nominee(&self, user_id: &str) -> Result<Vec<vault::Model>> {
        Ok(vault::Entity::find()
            .join(JoinType::InnerJoin, vault::Relation::VaultNominee.def())
            .filter(vault_nominee::Column::UserId.eq(user_id))
            .order_by_desc(vault::Column::CreatedAt)
            .all(&self.connection)
            .await?)
    }

    pub async fn owner_of(&self, vault: &vault::Model) -> Result<user::Model> {
        user::Entity::find_by_id(&vault.owner_id)
            .one(&self.connection)
            .await?
            .ok_or_else(|| {
                anyhow!(
                    "vault {} references missing owner {}",
                    vault.id,
                    vault.owner_id
                )
            })
    }

    pub async fn nominees_of(&self, vault_id: &str) -> Result<Vec<user::Model>> {
        Ok(user::Entity::find()
            .join(JoinType::InnerJoin, user::Relation::VaultNominee.def())
            .filter(vault_nominee::Column::VaultId.eq(vault_id))
            .all(&self.connection)
            .await?)
    }

    pub async fn record_access(
        &self,
        vault_id: &str,
        user_id: &str,
        access_type: AccessType,
    ) -> Result<access_log::Model> {
        let model = access_log::ActiveModel {
            id: NotSet,
            vault_id: Set(vault_id.to_string()),
            user_id: Set(user_id.to_string()),
            access_type: Set(access_type.as_str().to_string()),
            timestamp: Set(Utc::now()),
        };
        Ok(model.insert(&self.connection).await?)
    }

    pub async fn recent_access_logs(
        &self,
        vault_id: &str,
        limit: u64,
    ) -> Result<Vec<access_log::Model>> {
        Ok(access_log::Entity::find()
            .filter(access_log::Column::VaultId.eq(vault_id))
            .order_by_desc(access_log::Column::Timestamp)
            .limit(limit)
            .all(&self.connection)
            .await?)
    }

    pub async fn last_viewed_at(&self, vault_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(access_log::Entity::find()
            .filter(access_log::Column::VaultId.eq(vault_id))
            .filter(access_log::Column::AccessType.eq(AccessType::Viewed.as_str()))
            .order_by_desc(access_log::Column::Timestamp)
            .one(&self.connection)
            .await?
            .map(|log| log.timestamp))
    }

    pub async fn update_vault_status(
        &self,
        id: &str,
        status: VaultStatus,
        unlocked_at: Option<DateTime<Utc>>,
    ) -> Result<Option<vault::Model>> {
        let Some(vault) = self.vault_by_id(id).await? else {
            return Ok(None);
        };
        let mut active: vault::ActiveModel = vault.into();
        active.status = Set(status.as_str().to_string());
        if let Some(timestamp) = unlocked_at {
            active.unlocked_at = Set(Some(timestamp));
        }
        active.updated_at = Set(Utc::now());
        Ok(Some(active.update(&self.connection).await?))
    }

    pub async fn due_locked_vaults(&self, now: DateTime<Utc>) -> Result<Vec<vault::Model>> {
        Ok(vault::Entity::find()
            .filter(vault::Column::Status.eq(VaultStatus::Locked.as_str()))
            .filter(vault::Column::UnlockTime.lte(now))
            .all(&self.connection)
            .await?)
    }

    /// The persisted sweep: flips every due LOCKED vault to UNLOCKED
    /// with `unlocked_at = now` and appends one `UNLOCKED` audit row
    /// per nominee. The status filter on the update makes the sweep
    /// idempotent under concurrent invocations: whoever loses the race
    /// skips the vault entirely, so nominees are logged at most once.
    pub async fn unlock_due_vaults(&self, now: DateTime<Utc>) -> Result<Vec<UnlockedVault>> {
        let due = self.due_locked_vaults(now).await?;
        if due.is_empty() {
            return Ok(Vec::new());
        }

        let mut unlocked = Vec::with_capacity(due.len());
        for mut vault in due {
            let owner = self.owner_of(&vault).await?;
            let nominees = self.nominees_of(&vault.id).await?;

            let txn = self.connection.begin().await?;
            let result = vault::Entity::update_many()
                .col_expr(
                    vault::Column::Status,
                    Expr::value(VaultStatus::Unlocked.as_str()),
                )
                .col_expr(vault::Column::UnlockedAt, Expr::value(now))
                .col_expr(vault::Column::UpdatedAt, Expr::value(now))
                .filter(vault::Column::Id.eq(&vault.id))
                .filter(vault::Column::Status.eq(VaultStatus::Locked.as_str()))
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                txn.rollback().await?;
                continue;
            }

            let logs: Vec<access_log::ActiveModel> = nominees
                .iter()
                .map(|nominee| access_log::ActiveModel {
                    id: NotSet,
                    vault_id: Set(vault.id.clone()),
                    user_id: Set(nominee.id.clone()),
                    access_type: Set(AccessType::Unlocked.as_str().to_string()),
                    timestamp: Set(now),
                })
                .collect();
            if !logs.is_empty() {
                access_log::Entity::insert_many(logs).exec(&txn).await?;
            }
            txn.commit().await?;

            vault.status = VaultStatus::Unlocked.as_str().to_string();
            vault.unlocked_at = Some(now);
            vault.updated_at = now;
            unlocked.push(UnlockedVault {
                vault,
                owner,
                nominees,
            });
        }
        Ok(unlocked)
    }

    pub async fn counts(&self) -> Result<StoreCounts> {
        let locked_vaults = vault::Entity::find()
            .filter(vault::Column::Status.eq(VaultStatus::Locked.as_str()))
            .count(&self.connection)
            .await?;
        let unlocked_vaults = vault::Entity::find()
            .filter(vault::Column::Status.eq(VaultStatus::Unlocked.as_str()))
            .count(&self.connection)
            .await?;
        let users = user::Entity::find().count(&self.connection).await?;
        let access_logs = access_log::Entity::find().count(&self.connection).await?;
        Ok(StoreCounts {
            locked_vaults,
            unlocked_vaults,
            users,
            access_logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address_lowercases_and_trims() {
        assert_eq!(
            normalize_address("  0xAbCdEf0123456789 "),
            "0xabcdef0123456789"
        );
        assert_eq!(normalize_address("0xabc"), "0xabc");
    }

    #[test]
    fn test_title_truncates_at_fifty_chars() {
        let short = "family photos";
        assert_eq!(title_from_description(short), short);

        let long = "a".repeat(80);
        let title = title_from_description(&long);
        assert_eq!(title.chars().count(), 50);

        // Multi-byte characters must not be split.
        let unicode = "é".repeat(60);
        assert_eq!(title_from_description(&unicode).chars().count(), 50);
    }
}

//! Vault entity
//!
//! The metadata record for one time-locked disclosure. The encrypted
//! payload and the on-chain transaction reference are opaque strings;
//! decryption is the Blocklock protocol's business. `status` holds the
//! persisted state machine column (`LOCKED` | `UNLOCKED`) which lags
//! behind the wall-clock-derived value until the sweep catches up.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "vaults")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub file_hash: Option<String>,
    pub ipfs_hash: Option<String>,
    pub unlock_time: DateTimeUtc,
    pub status: String,
    pub unlocked_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "Text", nullable)]
    pub encrypted_data: Option<String>,
    pub blockchain_id: Option<String>,
    pub owner_id: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(has_many = "super::vault_nominee::Entity")]
    VaultNominee,
    #[sea_orm(has_many = "super::access_log::Entity")]
    AccessLog,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::vault_nominee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VaultNominee.def()
    }
}

impl Related<super::access_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

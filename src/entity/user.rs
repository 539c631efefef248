//! User entity
//!
//! One row per wallet address, created lazily the first time the
//! address shows up as an owner or a nominee. Addresses are stored
//! lowercase and are unique.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub address: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vault::Entity")]
    Vault,
    #[sea_orm(has_many = "super::vault_nominee::Entity")]
    VaultNominee,
    #[sea_orm(has_many = "super::access_log::Entity")]
    AccessLog,
}

impl Related<super::vault::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vault.def()
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

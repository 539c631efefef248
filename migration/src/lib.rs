pub use sea_orm_migration::prelude::*;

mod m20250801_000001_create_users;
mod m20250801_000002_create_vaults;
mod m20250801_000003_create_vault_nominees;
mod m20250801_000004_create_access_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_000001_create_users::Migration),
            Box::new(m20250801_000002_create_vaults::Migration),
            Box::new(m20250801_000003_create_vault_nominees::Migration),
            Box::new(m20250801_000004_create_access_logs::Migration),
        ]
    }
}

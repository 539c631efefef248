use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VaultNominee::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VaultNominee::VaultId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VaultNominee::UserId)
                            .string_len(36)
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(VaultNominee::VaultId)
                            .col(VaultNominee::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        // Nominee-side lookups ("vaults shared with me").
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-vault_nominees-user_id")
                    .table(VaultNominee::Table)
                    .col(VaultNominee::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VaultNominee::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VaultNominee {
    #[sea_orm(iden = "vault_nominees")]
    Table,
    VaultId,
    UserId,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vault::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vault::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vault::Title).string_len(64).not_null())
                    .col(ColumnDef::new(Vault::Description).text().not_null())
                    .col(ColumnDef::new(Vault::FileName).string_len(255))
                    .col(ColumnDef::new(Vault::FileType).string_len(128))
                    .col(ColumnDef::new(Vault::FileSize).big_integer())
                    .col(ColumnDef::new(Vault::FileHash).string_len(128))
                    .col(ColumnDef::new(Vault::IpfsHash).string_len(128))
                    .col(
                        ColumnDef::new(Vault::UnlockTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vault::Status)
                            .string_len(16)
                            .not_null()
                            .default("LOCKED"),
                    )
                    .col(ColumnDef::new(Vault::UnlockedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Vault::EncryptedData).text())
                    .col(ColumnDef::new(Vault::BlockchainId).string_len(255))
                    .col(ColumnDef::new(Vault::OwnerId).string_len(36).not_null())
                    .col(
                        ColumnDef::new(Vault::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vault::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-vaults-owner_id")
                    .table(Vault::Table)
                    .col(Vault::OwnerId)
                    .to_owned(),
            )
            .await?;

        // The sweep scans LOCKED vaults whose unlock time has passed.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-vaults-status-unlock_time")
                    .table(Vault::Table)
                    .col(Vault::Status)
                    .col(Vault::UnlockTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-vaults-created_at")
                    .table(Vault::Table)
                    .col(Vault::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vault::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Vault {
    #[sea_orm(iden = "vaults")]
    Table,
    Id,
    Title,
    Description,
    FileName,
    FileType,
    FileSize,
    FileHash,
    IpfsHash,
    UnlockTime,
    Status,
    UnlockedAt,
    EncryptedData,
    BlockchainId,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Accounts {
    Table,
    AccountId,
    PrimaryCredential,
    PrimaryProvider,
    PrimaryMethod,
    DisplayName,
    AvatarUrl,
    Email,
    UsernameInitialized,
    ProfileEditAllowed,
    MetadataJson,
    CreatedAt,
    UpdatedAt,
    LastLoginAt,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20260301_000001_create_accounts_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .col(
                        ColumnDef::new(Accounts::AccountId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Accounts::PrimaryCredential)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::PrimaryProvider)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Accounts::PrimaryMethod).string().not_null())
                    .col(ColumnDef::new(Accounts::DisplayName).string())
                    .col(ColumnDef::new(Accounts::AvatarUrl).string())
                    .col(ColumnDef::new(Accounts::Email).string())
                    .col(
                        ColumnDef::new(Accounts::UsernameInitialized)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Accounts::ProfileEditAllowed)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Accounts::MetadataJson)
                            .string()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::LastLoginAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Username uniqueness probes filter on display_name
        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_display_name")
                    .table(Accounts::Table)
                    .col(Accounts::DisplayName)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_accounts_display_name").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await
    }
}

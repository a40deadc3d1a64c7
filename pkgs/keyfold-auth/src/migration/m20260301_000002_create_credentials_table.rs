use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Credentials {
    Table,
    Key,
    AccountId,
    Provider,
    Method,
    DisplayAddress,
    ProviderUserId,
    Email,
    Username,
    IsPrimary,
    LinkedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    AccountId,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20260301_000002_create_credentials_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The primary key on `key` is the ownership invariant: at most one
        // account per credential key, enforced by the schema itself.
        manager
            .create_table(
                Table::create()
                    .table(Credentials::Table)
                    .col(
                        ColumnDef::new(Credentials::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Credentials::AccountId).string().not_null())
                    .col(ColumnDef::new(Credentials::Provider).string().not_null())
                    .col(ColumnDef::new(Credentials::Method).string().not_null())
                    .col(
                        ColumnDef::new(Credentials::DisplayAddress)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Credentials::ProviderUserId).string())
                    .col(ColumnDef::new(Credentials::Email).string())
                    .col(ColumnDef::new(Credentials::Username).string())
                    .col(
                        ColumnDef::new(Credentials::IsPrimary)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Credentials::LinkedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credentials_account")
                            .from(Credentials::Table, Credentials::AccountId)
                            .to(Accounts::Table, Accounts::AccountId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Connection summaries list all keys of one account
        manager
            .create_index(
                Index::create()
                    .name("idx_credentials_account")
                    .table(Credentials::Table)
                    .col(Credentials::AccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_credentials_account").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Credentials::Table).to_owned())
            .await
    }
}

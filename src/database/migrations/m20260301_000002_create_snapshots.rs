use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Snapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Snapshots::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Snapshots::Label).string().not_null())
                    .col(ColumnDef::new(Snapshots::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Snapshots::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Snapshots::NodeCount).integer().not_null())
                    .col(ColumnDef::new(Snapshots::Data).json_binary().not_null())
                    .to_owned(),
            )
            .await?;

        // Listing is newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_snapshots_created_at")
                    .table(Snapshots::Table)
                    .col(Snapshots::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Snapshots::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Snapshots {
    Table,
    Id,
    Label,
    CreatedAt,
    CreatedBy,
    NodeCount,
    Data,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScriptNodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScriptNodes::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScriptNodes::NodeType).string().not_null())
                    .col(ColumnDef::new(ScriptNodes::SortOrder).integer().not_null())
                    .col(ColumnDef::new(ScriptNodes::Payload).json_binary().not_null())
                    .col(ColumnDef::new(ScriptNodes::PositionX).double())
                    .col(ColumnDef::new(ScriptNodes::PositionY).double())
                    .col(ColumnDef::new(ScriptNodes::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_script_nodes_sort_order")
                    .table(ScriptNodes::Table)
                    .col(ScriptNodes::SortOrder)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScriptNodes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScriptNodes {
    Table,
    Id,
    NodeType,
    SortOrder,
    Payload,
    PositionX,
    PositionY,
    UpdatedAt,
}

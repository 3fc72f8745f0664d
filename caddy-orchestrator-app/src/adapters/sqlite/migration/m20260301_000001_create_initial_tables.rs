use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Instance::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Instance::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Instance::Name).string().not_null())
                    .col(ColumnDef::new(Instance::AdminUrl).string().not_null())
                    .col(
                        ColumnDef::new(Instance::Status)
                            .string()
                            .not_null()
                            .default("unknown"),
                    )
                    .col(ColumnDef::new(Instance::LatencyMs).big_integer().null())
                    .col(ColumnDef::new(Instance::LastError).string().null())
                    .col(ColumnDef::new(Instance::LastCheckedAt).string().null())
                    .col(
                        ColumnDef::new(Instance::SyncPending)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Instance::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Instance::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Route::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Route::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Route::InstanceId).string().not_null())
                    .col(ColumnDef::new(Route::Domain).string().not_null())
                    .col(ColumnDef::new(Route::Path).string().null())
                    .col(ColumnDef::new(Route::StripPrefix).string().null())
                    .col(ColumnDef::new(Route::HandlerType).string().not_null())
                    .col(
                        ColumnDef::new(Route::HandlerConfig)
                            .string()
                            .not_null()
                            .default("{}"),
                    )
                    .col(ColumnDef::new(Route::Headers).string().null())
                    .col(
                        ColumnDef::new(Route::Enabled)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Route::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Route::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_routes_instance_id")
                    .table(Route::Table)
                    .col(Route::InstanceId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GlobalConfig::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GlobalConfig::InstanceId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GlobalConfig::AdminUrl).string().not_null())
                    .col(
                        ColumnDef::new(GlobalConfig::EnableEncode)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(GlobalConfig::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EditHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EditHistory::Seq)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EditHistory::Id)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(EditHistory::InstanceId).string().not_null())
                    .col(ColumnDef::new(EditHistory::Actor).string().not_null())
                    .col(ColumnDef::new(EditHistory::CreatedAt).string().not_null())
                    .col(ColumnDef::new(EditHistory::PreviousConfig).string().null())
                    .col(ColumnDef::new(EditHistory::NewConfig).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_edit_history_instance_id")
                    .table(EditHistory::Table)
                    .col(EditHistory::InstanceId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EditHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GlobalConfig::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Route::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Instance::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Instance {
    #[sea_orm(iden = "instances")]
    Table,
    Id,
    Name,
    AdminUrl,
    Status,
    LatencyMs,
    LastError,
    LastCheckedAt,
    SyncPending,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Route {
    #[sea_orm(iden = "routes")]
    Table,
    Id,
    InstanceId,
    Domain,
    Path,
    StripPrefix,
    HandlerType,
    HandlerConfig,
    Headers,
    Enabled,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum GlobalConfig {
    #[sea_orm(iden = "global_configs")]
    Table,
    InstanceId,
    AdminUrl,
    EnableEncode,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum EditHistory {
    #[sea_orm(iden = "edit_history")]
    Table,
    Seq,
    Id,
    InstanceId,
    Actor,
    CreatedAt,
    PreviousConfig,
    NewConfig,
}

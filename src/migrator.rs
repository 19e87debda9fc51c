use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_events_table::Migration),
            Box::new(m20240301_000002_create_ticket_types_table::Migration),
            Box::new(m20240301_000003_create_sale_phases_table::Migration),
            Box::new(m20240301_000004_create_pending_reservations_table::Migration),
            Box::new(m20240301_000005_create_tickets_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_events_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_events_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Events::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Events::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Events::OwnerId).uuid().not_null())
                        .col(ColumnDef::new(Events::Title).string().not_null())
                        .col(ColumnDef::new(Events::Description).string().not_null())
                        .col(ColumnDef::new(Events::OrganizedBy).string().not_null())
                        .col(
                            ColumnDef::new(Events::EventDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Events::Location).string().not_null())
                        .col(ColumnDef::new(Events::Image).string().null())
                        .col(
                            ColumnDef::new(Events::Likes)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Events::Status).string().not_null())
                        .col(
                            ColumnDef::new(Events::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Events::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_events_status")
                        .table(Events::Table)
                        .col(Events::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Events::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Events {
        Table,
        Id,
        OwnerId,
        Title,
        Description,
        OrganizedBy,
        EventDate,
        Location,
        Image,
        Likes,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_ticket_types_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_ticket_types_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TicketTypes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TicketTypes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TicketTypes::EventId).uuid().not_null())
                        .col(ColumnDef::new(TicketTypes::Kind).string().not_null())
                        .col(
                            ColumnDef::new(TicketTypes::UnitPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TicketTypes::QuantityAvailable)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TicketTypes::QuantitySold)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TicketTypes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One inventory row per (event, tier)
            manager
                .create_index(
                    Index::create()
                        .name("uq_ticket_types_event_kind")
                        .table(TicketTypes::Table)
                        .col(TicketTypes::EventId)
                        .col(TicketTypes::Kind)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TicketTypes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum TicketTypes {
        Table,
        Id,
        EventId,
        Kind,
        UnitPrice,
        QuantityAvailable,
        QuantitySold,
        CreatedAt,
    }
}

mod m20240301_000003_create_sale_phases_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_sale_phases_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SalePhases::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalePhases::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalePhases::EventId).uuid().not_null())
                        .col(ColumnDef::new(SalePhases::PhaseName).string().not_null())
                        .col(
                            ColumnDef::new(SalePhases::StartDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalePhases::EndDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalePhases::DiscountPercent)
                                .integer()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_sale_phases_event_id")
                        .table(SalePhases::Table)
                        .col(SalePhases::EventId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalePhases::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SalePhases {
        Table,
        Id,
        EventId,
        PhaseName,
        StartDate,
        EndDate,
        DiscountPercent,
    }
}

mod m20240301_000004_create_pending_reservations_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_pending_reservations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PendingReservations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PendingReservations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingReservations::TransactionId)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingReservations::BuyerId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingReservations::EventId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingReservations::TicketKind)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingReservations::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingReservations::Amount)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingReservations::Status)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingReservations::ExternalRef)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PendingReservations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingReservations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            // The idempotency key for the whole confirmation flow
            manager
                .create_index(
                    Index::create()
                        .name("uq_pending_reservations_transaction_id")
                        .table(PendingReservations::Table)
                        .col(PendingReservations::TransactionId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // Reaper scans pending rows by age
            manager
                .create_index(
                    Index::create()
                        .name("idx_pending_reservations_status_created_at")
                        .table(PendingReservations::Table)
                        .col(PendingReservations::Status)
                        .col(PendingReservations::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PendingReservations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PendingReservations {
        Table,
        Id,
        TransactionId,
        BuyerId,
        EventId,
        TicketKind,
        Quantity,
        Amount,
        Status,
        ExternalRef,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000005_create_tickets_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_tickets_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Tickets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Tickets::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Tickets::BuyerId).uuid().not_null())
                        .col(ColumnDef::new(Tickets::EventId).uuid().not_null())
                        .col(ColumnDef::new(Tickets::TransactionId).string().not_null())
                        .col(ColumnDef::new(Tickets::UnitIndex).integer().not_null())
                        .col(ColumnDef::new(Tickets::TicketKind).string().not_null())
                        .col(
                            ColumnDef::new(Tickets::UnitPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Tickets::HolderName).string().null())
                        .col(ColumnDef::new(Tickets::HolderEmail).string().null())
                        .col(ColumnDef::new(Tickets::QrPayload).text().not_null())
                        .col(
                            ColumnDef::new(Tickets::IssuedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_tickets_buyer_id")
                        .table(Tickets::Table)
                        .col(Tickets::BuyerId)
                        .to_owned(),
                )
                .await?;

            // At most one ticket per unit of a transaction, enforced at the
            // store level as a backstop behind the coordinator's lock.
            manager
                .create_index(
                    Index::create()
                        .name("uq_tickets_transaction_unit")
                        .table(Tickets::Table)
                        .col(Tickets::TransactionId)
                        .col(Tickets::UnitIndex)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Tickets::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Tickets {
        Table,
        Id,
        BuyerId,
        EventId,
        TransactionId,
        UnitIndex,
        TicketKind,
        UnitPrice,
        HolderName,
        HolderEmail,
        QrPayload,
        IssuedAt,
    }
}

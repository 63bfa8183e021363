use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_fleet_tables::Migration),
            Box::new(m20240301_000002_create_shipments_tables::Migration),
            Box::new(m20240301_000003_create_assignments_tables::Migration),
        ]
    }
}

mod m20240301_000001_create_fleet_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_fleet_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Vehicles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Vehicles::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Vehicles::LicensePlate).string().not_null())
                        .col(ColumnDef::new(Vehicles::Make).string().not_null())
                        .col(ColumnDef::new(Vehicles::ModelName).string().not_null())
                        .col(ColumnDef::new(Vehicles::ModelYear).integer().not_null())
                        .col(ColumnDef::new(Vehicles::FuelType).string().not_null())
                        .col(ColumnDef::new(Vehicles::LoadCapacityKg).double().not_null())
                        .col(
                            ColumnDef::new(Vehicles::CurrentMileage)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Vehicles::LastServiceMileage)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Vehicles::NextServiceMileage)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Vehicles::FuelConsumption).double().null())
                        .col(ColumnDef::new(Vehicles::DriverId).uuid().null())
                        .col(
                            ColumnDef::new(Vehicles::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Vehicles::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_vehicles_license_plate")
                        .table(Vehicles::Table)
                        .col(Vehicles::LicensePlate)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Drivers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Drivers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Drivers::UserId).uuid().not_null())
                        .col(ColumnDef::new(Drivers::LicenseNumber).string().not_null())
                        .col(ColumnDef::new(Drivers::LicenseExpiryDate).date().not_null())
                        .col(ColumnDef::new(Drivers::PhoneNumber).string().not_null())
                        .col(ColumnDef::new(Drivers::VehicleId).uuid().null())
                        .col(
                            ColumnDef::new(Drivers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Drivers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_drivers_license_number")
                        .table(Drivers::Table)
                        .col(Drivers::LicenseNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_drivers_user_id")
                        .table(Drivers::Table)
                        .col(Drivers::UserId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Drivers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Vehicles::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Drivers {
        Table,
        Id,
        UserId,
        LicenseNumber,
        LicenseExpiryDate,
        PhoneNumber,
        VehicleId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Vehicles {
        Table,
        Id,
        LicensePlate,
        Make,
        ModelName,
        ModelYear,
        FuelType,
        LoadCapacityKg,
        CurrentMileage,
        LastServiceMileage,
        NextServiceMileage,
        FuelConsumption,
        DriverId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_shipments_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_shipments_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Shipments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Shipments::TrackingNumber).string().not_null())
                        .col(ColumnDef::new(Shipments::WeightKg).double().not_null())
                        .col(ColumnDef::new(Shipments::VolumeM3).double().not_null())
                        .col(ColumnDef::new(Shipments::OriginAddress).string().not_null())
                        .col(ColumnDef::new(Shipments::OriginLatitude).double().null())
                        .col(ColumnDef::new(Shipments::OriginLongitude).double().null())
                        .col(
                            ColumnDef::new(Shipments::DestinationAddress)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Shipments::DestinationLatitude).double().null())
                        .col(
                            ColumnDef::new(Shipments::DestinationLongitude)
                                .double()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::DeclaredValue)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(ColumnDef::new(Shipments::Status).string().not_null())
                        .col(
                            ColumnDef::new(Shipments::ExpectedDeliveryDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::ActualDeliveryDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Shipments::DeliveryRecipient).string().null())
                        .col(ColumnDef::new(Shipments::DeliveryNotes).string().null())
                        .col(ColumnDef::new(Shipments::DeliveryLatitude).double().null())
                        .col(ColumnDef::new(Shipments::DeliveryLongitude).double().null())
                        .col(ColumnDef::new(Shipments::IssueType).string().null())
                        .col(ColumnDef::new(Shipments::IssueDescription).string().null())
                        .col(
                            ColumnDef::new(Shipments::IssueEstimatedDelayMinutes)
                                .integer()
                                .null(),
                        )
                        .col(ColumnDef::new(Shipments::IssueLatitude).double().null())
                        .col(ColumnDef::new(Shipments::IssueLongitude).double().null())
                        .col(
                            ColumnDef::new(Shipments::IssueReportedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_tracking_number")
                        .table(Shipments::Table)
                        .col(Shipments::TrackingNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // Overdue reconciliation scans by status and expected delivery
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_status_expected_delivery")
                        .table(Shipments::Table)
                        .col(Shipments::Status)
                        .col(Shipments::ExpectedDeliveryDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Routes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Routes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Routes::ShipmentId).uuid().not_null())
                        .col(ColumnDef::new(Routes::OriginAddress).string().not_null())
                        .col(ColumnDef::new(Routes::OriginLatitude).double().null())
                        .col(ColumnDef::new(Routes::OriginLongitude).double().null())
                        .col(ColumnDef::new(Routes::DestinationAddress).string().not_null())
                        .col(ColumnDef::new(Routes::DestinationLatitude).double().null())
                        .col(ColumnDef::new(Routes::DestinationLongitude).double().null())
                        .col(
                            ColumnDef::new(Routes::EstimatedDistanceKm)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(
                            ColumnDef::new(Routes::EstimatedDurationMinutes)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Routes::Status).string().not_null())
                        .col(
                            ColumnDef::new(Routes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Routes::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_routes_shipment_id")
                                .from(Routes::Table, Routes::ShipmentId)
                                .to(Shipments::Table, Shipments::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_routes_shipment_id")
                        .table(Routes::Table)
                        .col(Routes::ShipmentId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Routes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Shipments {
        Table,
        Id,
        TrackingNumber,
        WeightKg,
        VolumeM3,
        OriginAddress,
        OriginLatitude,
        OriginLongitude,
        DestinationAddress,
        DestinationLatitude,
        DestinationLongitude,
        DeclaredValue,
        Status,
        ExpectedDeliveryDate,
        ActualDeliveryDate,
        DeliveryRecipient,
        DeliveryNotes,
        DeliveryLatitude,
        DeliveryLongitude,
        IssueType,
        IssueDescription,
        IssueEstimatedDelayMinutes,
        IssueLatitude,
        IssueLongitude,
        IssueReportedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Routes {
        Table,
        Id,
        ShipmentId,
        OriginAddress,
        OriginLatitude,
        OriginLongitude,
        DestinationAddress,
        DestinationLatitude,
        DestinationLongitude,
        EstimatedDistanceKm,
        EstimatedDurationMinutes,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_assignments_tables {
    use super::m20240301_000001_create_fleet_tables::{Drivers, Vehicles};
    use super::m20240301_000002_create_shipments_tables::Shipments;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_assignments_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Assignments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Assignments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Assignments::DriverId).uuid().not_null())
                        .col(ColumnDef::new(Assignments::VehicleId).uuid().not_null())
                        .col(ColumnDef::new(Assignments::RouteId).uuid().null())
                        .col(
                            ColumnDef::new(Assignments::StartTime)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Assignments::EndTime)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Assignments::Status).string().not_null())
                        .col(ColumnDef::new(Assignments::Notes).string().null())
                        .col(
                            ColumnDef::new(Assignments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Assignments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        // Active assignments are guarded in the service; completed history
                        // goes with the driver or vehicle.
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assignments_driver_id")
                                .from(Assignments::Table, Assignments::DriverId)
                                .to(Drivers::Table, Drivers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assignments_vehicle_id")
                                .from(Assignments::Table, Assignments::VehicleId)
                                .to(Vehicles::Table, Vehicles::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_assignments_driver_status")
                        .table(Assignments::Table)
                        .col(Assignments::DriverId)
                        .col(Assignments::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AssignmentShipments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AssignmentShipments::AssignmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AssignmentShipments::ShipmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AssignmentShipments::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .primary_key(
                            Index::create()
                                .col(AssignmentShipments::AssignmentId)
                                .col(AssignmentShipments::ShipmentId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assignment_shipments_assignment_id")
                                .from(AssignmentShipments::Table, AssignmentShipments::AssignmentId)
                                .to(Assignments::Table, Assignments::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assignment_shipments_shipment_id")
                                .from(AssignmentShipments::Table, AssignmentShipments::ShipmentId)
                                .to(Shipments::Table, Shipments::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            // One assignment per shipment
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_assignment_shipments_shipment_id")
                        .table(AssignmentShipments::Table)
                        .col(AssignmentShipments::ShipmentId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AssignmentShipments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Assignments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Assignments {
        Table,
        Id,
        DriverId,
        VehicleId,
        RouteId,
        StartTime,
        EndTime,
        Status,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum AssignmentShipments {
        Table,
        AssignmentId,
        ShipmentId,
        Position,
    }
}

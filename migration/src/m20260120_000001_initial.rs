use sea_orm::DatabaseBackend;
use sea_orm_migration::prelude::*;

/// Money column. On SQLite a REAL column keeps whole amounts in the float
/// storage class, which is how decimals are read back there.
fn money<T: IntoIden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut def = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => def.double(),
        _ => def.decimal_len(18, 2),
    };
    def.not_null();
    def
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
    Title,
    Price,
}

#[derive(DeriveIden)]
enum LearningPaths {
    Table,
    Id,
    Title,
    Price,
}

#[derive(DeriveIden)]
enum LearningPathCourses {
    Table,
    PathId,
    CourseId,
    Position,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    UserId,
    CourseId,
    PathId,
    TotalAmount,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    OrderId,
    TransactionGateId,
    PaymentMethod,
    Amount,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Enrollments {
    Table,
    Id,
    UserId,
    CourseId,
    EnrolledAt,
    Status,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // catalog (read-only for this service)
        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Courses::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Courses::Title).string_len(255).not_null())
                    .col(&mut money(manager, Courses::Price))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LearningPaths::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LearningPaths::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LearningPaths::Title)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(&mut money(manager, LearningPaths::Price))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LearningPathCourses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LearningPathCourses::PathId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LearningPathCourses::CourseId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LearningPathCourses::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(LearningPathCourses::PathId)
                            .col(LearningPathCourses::CourseId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_learning_path_courses_path")
                            .from(LearningPathCourses::Table, LearningPathCourses::PathId)
                            .to(LearningPaths::Table, LearningPaths::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_learning_path_courses_course")
                            .from(LearningPathCourses::Table, LearningPathCourses::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                    .col(ColumnDef::new(Orders::CourseId).uuid().null())
                    .col(ColumnDef::new(Orders::PathId).uuid().null())
                    .col(&mut money(manager, Orders::TotalAmount))
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string_len(50)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::OrderId).uuid().not_null())
                    .col(
                        ColumnDef::new(Transactions::TransactionGateId)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::PaymentMethod)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(&mut money(manager, Transactions::Amount))
                    .col(
                        ColumnDef::new(Transactions::Status)
                            .string_len(50)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_order")
                            .from(Transactions::Table, Transactions::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Enrollments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Enrollments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Enrollments::UserId).uuid().not_null())
                    .col(ColumnDef::new(Enrollments::CourseId).uuid().not_null())
                    .col(
                        ColumnDef::new(Enrollments::EnrolledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Enrollments::Status)
                            .string_len(50)
                            .not_null()
                            .default("active"),
                    )
                    .to_owned(),
            )
            .await?;

        // indexes
        for (name, table, col) in [
            ("idx_orders_user", Orders::Table, Orders::UserId),
            ("idx_orders_status", Orders::Table, Orders::Status),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(table)
                        .col(col)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transactions_order")
                    .table(Transactions::Table)
                    .col(Transactions::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_enrollments_user_course")
                    .table(Enrollments::Table)
                    .col(Enrollments::UserId)
                    .col(Enrollments::CourseId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Enrollments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(LearningPathCourses::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(LearningPaths::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Courses::Table).to_owned())
            .await?;
        Ok(())
    }
}

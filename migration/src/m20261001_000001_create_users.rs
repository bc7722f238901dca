use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Users::Table)
          .if_not_exists()
          .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
          .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
          .col(ColumnDef::new(Users::PasswordHash).string().not_null())
          .col(ColumnDef::new(Users::FirstName).string().not_null())
          .col(ColumnDef::new(Users::LastName).string().not_null())
          .col(ColumnDef::new(Users::Role).string().not_null().default("user"))
          .col(ColumnDef::new(Users::RegisteredAt).date_time().not_null())
          .col(ColumnDef::new(Users::LastLogin).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Users::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Users {
  Table,
  Id,
  Email,
  PasswordHash,
  FirstName,
  LastName,
  Role,
  RegisteredAt,
  LastLogin,
}

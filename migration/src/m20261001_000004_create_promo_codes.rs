use sea_orm_migration::prelude::*;

use super::m20261001_000002_create_courses::Courses;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(PromoCodes::Table)
          .if_not_exists()
          .col(ColumnDef::new(PromoCodes::Id).uuid().not_null().primary_key())
          .col(ColumnDef::new(PromoCodes::Code).string().not_null().unique_key())
          .col(ColumnDef::new(PromoCodes::CourseId).uuid().not_null())
          .col(ColumnDef::new(PromoCodes::ExpiresAt).date_time().not_null())
          // -1 means unlimited
          .col(
            ColumnDef::new(PromoCodes::MaxUses).integer().not_null().default(-1),
          )
          .col(
            ColumnDef::new(PromoCodes::UsedCount).integer().not_null().default(0),
          )
          .col(
            ColumnDef::new(PromoCodes::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(ColumnDef::new(PromoCodes::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_promo_codes_course")
              .from(PromoCodes::Table, PromoCodes::CourseId)
              .to(Courses::Table, Courses::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_promo_codes_course")
          .table(PromoCodes::Table)
          .col(PromoCodes::CourseId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(PromoCodes::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum PromoCodes {
  Table,
  Id,
  Code,
  CourseId,
  ExpiresAt,
  MaxUses,
  UsedCount,
  IsActive,
  CreatedAt,
}

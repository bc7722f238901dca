use sea_orm_migration::prelude::*;

use super::{
  m20261001_000001_create_users::Users,
  m20261001_000002_create_courses::Courses,
  m20261001_000004_create_promo_codes::PromoCodes,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(CourseAccess::Table)
          .if_not_exists()
          .col(ColumnDef::new(CourseAccess::Id).uuid().not_null().primary_key())
          .col(ColumnDef::new(CourseAccess::UserId).uuid().not_null())
          .col(ColumnDef::new(CourseAccess::CourseId).uuid().not_null())
          .col(ColumnDef::new(CourseAccess::PromoCodeId).uuid().not_null())
          .col(ColumnDef::new(CourseAccess::GrantedAt).date_time().not_null())
          .col(ColumnDef::new(CourseAccess::LastAccessed).date_time().not_null())
          .col(ColumnDef::new(CourseAccess::Progress).json().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_course_access_user")
              .from(CourseAccess::Table, CourseAccess::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_course_access_course")
              .from(CourseAccess::Table, CourseAccess::CourseId)
              .to(Courses::Table, Courses::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_course_access_promo_code")
              .from(CourseAccess::Table, CourseAccess::PromoCodeId)
              .to(PromoCodes::Table, PromoCodes::Id),
          )
          .to_owned(),
      )
      .await?;

    // one grant per (user, course)
    manager
      .create_index(
        Index::create()
          .name("idx_course_access_user_course")
          .table(CourseAccess::Table)
          .col(CourseAccess::UserId)
          .col(CourseAccess::CourseId)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(CourseAccess::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum CourseAccess {
  Table,
  Id,
  UserId,
  CourseId,
  PromoCodeId,
  GrantedAt,
  LastAccessed,
  Progress,
}

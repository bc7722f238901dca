use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Courses::Table)
          .if_not_exists()
          .col(ColumnDef::new(Courses::Id).uuid().not_null().primary_key())
          .col(ColumnDef::new(Courses::Title).string().not_null())
          .col(ColumnDef::new(Courses::Description).text().not_null())
          .col(ColumnDef::new(Courses::ThumbnailUrl).string().not_null())
          .col(ColumnDef::new(Courses::Categories).json().not_null())
          .col(ColumnDef::new(Courses::Tags).json().not_null())
          .col(
            ColumnDef::new(Courses::IsPublished)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Courses::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Courses::UpdatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_courses_created_at")
          .table(Courses::Table)
          .col(Courses::CreatedAt)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Courses::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Courses {
  Table,
  Id,
  Title,
  Description,
  ThumbnailUrl,
  Categories,
  Tags,
  IsPublished,
  CreatedAt,
  UpdatedAt,
}

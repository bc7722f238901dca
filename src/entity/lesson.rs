use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Downloadable attachment of a lesson
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
  pub title: String,
  pub file_url: String,
  pub file_type: String,
}

#[derive(
  Clone,
  Debug,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  FromJsonQueryResult,
)]
#[serde(transparent)]
pub struct Materials(pub Vec<Material>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "lessons")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub course_id: Uuid,
  pub title: String,
  pub description: String,
  pub video_url: String,
  pub duration_seconds: i32,
  /// 1-based display order inside the course
  pub position: i32,
  pub materials: Materials,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::course::Entity",
    from = "Column::CourseId",
    to = "super::course::Column::Id"
  )]
  Course,
}

impl Related<super::course::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Course.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}

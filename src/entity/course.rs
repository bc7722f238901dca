use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Free-form string list stored as a json array (categories, tags)
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
pub struct Labels(pub Vec<String>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "courses")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub title: String,
  pub description: String,
  pub thumbnail_url: String,
  pub categories: Labels,
  pub tags: Labels,
  pub is_published: bool,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::lesson::Entity")]
  Lessons,
  #[sea_orm(has_many = "super::promo_code::Entity")]
  PromoCodes,
  #[sea_orm(has_many = "super::course_access::Entity")]
  CourseAccess,
}

impl Related<super::lesson::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Lessons.def()
  }
}

impl Related<super::promo_code::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::PromoCodes.def()
  }
}

impl Related<super::course_access::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::CourseAccess.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}

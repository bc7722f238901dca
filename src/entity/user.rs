use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
  Clone,
  Copy,
  Debug,
  Default,
  PartialEq,
  Eq,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  #[sea_orm(string_value = "user")]
  User,
  #[sea_orm(string_value = "admin")]
  Admin,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  #[sea_orm(unique)]
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub first_name: String,
  pub last_name: String,
  pub role: Role,
  pub registered_at: DateTime,
  pub last_login: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::course_access::Entity")]
  CourseAccess,
}

impl Related<super::course_access::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::CourseAccess.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}

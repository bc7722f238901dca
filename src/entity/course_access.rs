//! Course access grants, at most one per (user, course)

use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
  pub lesson_id: Uuid,
  pub completed: bool,
  pub last_viewed_at: DateTime,
  pub watch_time_seconds: i64,
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
pub struct Progress(pub Vec<LessonProgress>);

impl Progress {
  /// Merges a viewing report into the lesson's entry, appending one if absent.
  /// Watch time accumulates (saturating) and completion never reverts.
  pub fn record(
    &mut self,
    lesson_id: Uuid,
    watch_seconds: i64,
    completed: bool,
    now: DateTime,
  ) -> &LessonProgress {
    let idx = match self.0.iter().position(|p| p.lesson_id == lesson_id) {
      Some(idx) => idx,
      None => {
        self.0.push(LessonProgress {
          lesson_id,
          completed: false,
          last_viewed_at: now,
          watch_time_seconds: 0,
        });
        self.0.len() - 1
      }
    };

    let entry = &mut self.0[idx];
    entry.watch_time_seconds =
      entry.watch_time_seconds.saturating_add(watch_seconds.max(0));
    entry.completed |= completed;
    entry.last_viewed_at = now;
    entry
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "course_access")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  /// Unique together with `course_id`
  pub user_id: Uuid,
  pub course_id: Uuid,
  pub promo_code_id: Uuid,
  pub granted_at: DateTime,
  pub last_accessed: DateTime,
  pub progress: Progress,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::user::Entity",
    from = "Column::UserId",
    to = "super::user::Column::Id"
  )]
  User,
  #[sea_orm(
    belongs_to = "super::course::Entity",
    from = "Column::CourseId",
    to = "super::course::Column::Id"
  )]
  Course,
  #[sea_orm(
    belongs_to = "super::promo_code::Entity",
    from = "Column::PromoCodeId",
    to = "super::promo_code::Column::Id"
  )]
  PromoCode,
}

impl Related<super::user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl Related<super::course::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Course.def()
  }
}

impl Related<super::promo_code::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::PromoCode.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}

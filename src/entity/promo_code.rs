//! Promo codes: redeemable keys that unlock exactly one course

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `max_uses` value meaning the code has no usage cap
pub const UNLIMITED: i32 = -1;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "promo_codes")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  /// Always stored uppercase, see [`normalize`]
  #[sea_orm(unique)]
  pub code: String,
  pub course_id: Uuid,
  pub expires_at: DateTime,
  pub max_uses: i32,
  pub used_count: i32,
  pub is_active: bool,
  pub created_at: DateTime,
}

impl Model {
  pub fn is_expired(&self, now: DateTime) -> bool {
    now > self.expires_at
  }

  pub fn is_exhausted(&self) -> bool {
    self.max_uses != UNLIMITED && self.used_count >= self.max_uses
  }

  /// Computed on every use and never persisted.
  pub fn is_valid(&self, now: DateTime) -> bool {
    self.is_active && !self.is_expired(now) && !self.is_exhausted()
  }
}

/// Canonical form of a user supplied code.
pub fn normalize(code: &str) -> String {
  code.trim().to_uppercase()
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::course::Entity",
    from = "Column::CourseId",
    to = "super::course::Column::Id"
  )]
  Course,
  #[sea_orm(has_many = "super::course_access::Entity")]
  CourseAccess,
}

impl Related<super::course::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Course.def()
  }
}

impl Related<super::course_access::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::CourseAccess.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, Utc};

  use super::*;

  fn code(max_uses: i32, used_count: i32, expires_in: TimeDelta) -> Model {
    let now = Utc::now().naive_utc();
    Model {
      id: Uuid::new_v4(),
      code: "COURSE123".into(),
      course_id: Uuid::new_v4(),
      expires_at: now + expires_in,
      max_uses,
      used_count,
      is_active: true,
      created_at: now,
    }
  }

  #[test]
  fn unlimited_code_is_never_exhausted() {
    let promo = code(UNLIMITED, 10_000, TimeDelta::days(1));
    assert!(!promo.is_exhausted());
    assert!(promo.is_valid(Utc::now().naive_utc()));
  }

  #[test]
  fn capped_code_exhausts_at_limit() {
    assert!(!code(2, 1, TimeDelta::days(1)).is_exhausted());
    assert!(code(2, 2, TimeDelta::days(1)).is_exhausted());
    assert!(code(2, 3, TimeDelta::days(1)).is_exhausted());
  }

  #[test]
  fn expiry_is_strictly_after_deadline() {
    let promo = code(UNLIMITED, 0, TimeDelta::zero());
    assert!(!promo.is_expired(promo.expires_at));
    assert!(promo.is_expired(promo.expires_at + TimeDelta::seconds(1)));
  }

  #[test]
  fn inactive_code_is_invalid() {
    let promo = Model { is_active: false, ..code(UNLIMITED, 0, TimeDelta::days(1)) };
    assert!(!promo.is_valid(Utc::now().naive_utc()));
  }

  #[test]
  fn normalize_uppercases_and_trims() {
    assert_eq!(normalize("  course123 "), "COURSE123");
  }
}

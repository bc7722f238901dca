//! Promo code registry and redemption

use sea_orm::{Condition, SqlErr, sea_query::Expr};
use serde::Deserialize;

use crate::{
  entity::{Progress, course, course_access, promo_code},
  error::Promo as Rejected,
  prelude::*,
  sv,
};

pub struct Promo<'a> {
  db: &'a DatabaseConnection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPromoCode {
  pub code: String,
  pub course_id: Uuid,
  pub expires_at: DateTime,
  #[serde(default)]
  pub max_uses: Option<i32>,
}

/// Successful outcome of a redemption
#[derive(Debug, Clone, PartialEq)]
pub enum Redemption {
  /// A new grant was written and the code's counter advanced
  Granted(course::Model),
  /// The user already held a grant; nothing was written
  AlreadyGranted(course::Model),
}

impl Redemption {
  pub fn course(&self) -> &course::Model {
    match self {
      Redemption::Granted(course) | Redemption::AlreadyGranted(course) => course,
    }
  }
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
  matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl<'a> Promo<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, new: NewPromoCode) -> Result<promo_code::Model> {
    let code = promo_code::normalize(&new.code);
    if code.is_empty() {
      return Err(Error::validation("Promo code must not be empty"));
    }

    let max_uses = new.max_uses.unwrap_or(promo_code::UNLIMITED);
    if max_uses != promo_code::UNLIMITED && max_uses < 1 {
      return Err(Error::validation("maxUses must be -1 (unlimited) or positive"));
    }

    sv::Course::new(self.db)
      .by_id(new.course_id)
      .await?
      .ok_or(Error::CourseNotFound)?;

    let promo = promo_code::ActiveModel {
      id: Set(Uuid::new_v4()),
      code: Set(code),
      course_id: Set(new.course_id),
      expires_at: Set(new.expires_at),
      max_uses: Set(max_uses),
      used_count: Set(0),
      is_active: Set(true),
      created_at: Set(Utc::now().naive_utc()),
    };

    match promo.insert(self.db).await {
      Ok(promo) => Ok(promo),
      Err(err) if is_unique_violation(&err) => Err(Rejected::Duplicate.into()),
      Err(err) => Err(err.into()),
    }
  }

  pub async fn by_code(&self, code: &str) -> Result<Option<promo_code::Model>> {
    let promo = promo_code::Entity::find()
      .filter(promo_code::Column::Code.eq(promo_code::normalize(code)))
      .one(self.db)
      .await?;
    Ok(promo)
  }

  pub async fn for_course(
    &self,
    course_id: Uuid,
  ) -> Result<Vec<promo_code::Model>> {
    let codes = promo_code::Entity::find()
      .filter(promo_code::Column::CourseId.eq(course_id))
      .order_by_desc(promo_code::Column::CreatedAt)
      .all(self.db)
      .await?;
    Ok(codes)
  }

  pub async fn set_active(&self, code: &str, active: bool) -> Result<()> {
    let promo = self.by_code(code).await?.ok_or(Rejected::Invalid)?;

    promo_code::ActiveModel { is_active: Set(active), ..promo.into() }
      .update(self.db)
      .await?;

    Ok(())
  }

  /// Turns `code` into a course grant for `user_id`.
  ///
  /// Checks run in order and the first failure wins: unknown or inactive
  /// code (scoped to `course_id`), expiry, usage cap, course existence.
  /// An existing grant is reported as [`Redemption::AlreadyGranted`] without
  /// any write. Otherwise the grant insert and the counter increment commit
  /// together or not at all.
  pub async fn redeem(
    &self,
    code: &str,
    course_id: Uuid,
    user_id: Uuid,
  ) -> Result<Redemption> {
    let code = promo_code::normalize(code);
    if code.is_empty() {
      return Err(Error::validation("Promo code is required"));
    }
    let now = Utc::now().naive_utc();

    let promo = promo_code::Entity::find()
      .filter(promo_code::Column::Code.eq(&code))
      .filter(promo_code::Column::CourseId.eq(course_id))
      .filter(promo_code::Column::IsActive.eq(true))
      .one(self.db)
      .await?
      .ok_or(Rejected::Invalid)?;

    if promo.is_expired(now) {
      return Err(Rejected::Expired.into());
    }
    if promo.is_exhausted() {
      return Err(Rejected::Exhausted.into());
    }

    let course = sv::Course::new(self.db)
      .by_id(course_id)
      .await?
      .ok_or(Error::CourseNotFound)?;

    if sv::Access::new(self.db).grant(user_id, course_id).await?.is_some() {
      debug!(%user_id, %course_id, "Course already granted");
      return Ok(Redemption::AlreadyGranted(course));
    }

    let txn = self.db.begin().await?;

    let grant = course_access::ActiveModel {
      id: Set(Uuid::new_v4()),
      user_id: Set(user_id),
      course_id: Set(course_id),
      promo_code_id: Set(promo.id),
      granted_at: Set(now),
      last_accessed: Set(now),
      progress: Set(Progress::default()),
    };

    // a concurrent redemption for the same pair got there first
    match course_access::Entity::insert(grant).exec_without_returning(&txn).await
    {
      Ok(_) => {}
      Err(err) if is_unique_violation(&err) => {
        txn.rollback().await?;
        debug!(%user_id, %course_id, "Grant raced with a concurrent redemption");
        return Ok(Redemption::AlreadyGranted(course));
      }
      Err(err) => return Err(err.into()),
    }

    // increment only while below the cap, in the same statement as the check
    let used = promo_code::Entity::update_many()
      .col_expr(
        promo_code::Column::UsedCount,
        Expr::col(promo_code::Column::UsedCount).add(1),
      )
      .filter(promo_code::Column::Id.eq(promo.id))
      .filter(
        Condition::any()
          .add(promo_code::Column::MaxUses.eq(promo_code::UNLIMITED))
          .add(
            Expr::col(promo_code::Column::UsedCount)
              .lt(Expr::col(promo_code::Column::MaxUses)),
          ),
      )
      .exec(&txn)
      .await?;

    if used.rows_affected == 0 {
      txn.rollback().await?;
      info!(%user_id, code = %promo.code, "Promo code ran out while redeeming");
      return Err(Rejected::Exhausted.into());
    }

    txn.commit().await?;

    info!(%user_id, %course_id, code = %promo.code, "Promo code redeemed");
    Ok(Redemption::Granted(course))
  }
}

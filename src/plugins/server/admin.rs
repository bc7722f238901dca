//! Course and promo code authoring, admin only

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use super::{
  auth::Admin,
  courses::{CoursesRes, PageQuery},
  extract::{Json, Path, Query},
};
use crate::{
  entity::promo_code,
  prelude::*,
  state::AppState,
  sv::{course::NewCourse, promo::NewPromoCode},
};

pub async fn list_courses(
  State(app): State<Arc<AppState>>,
  _admin: Admin,
  Query(query): Query<PageQuery>,
) -> Result<Json<CoursesRes>> {
  let page = app.sv().course.list(query.page, query.limit).await?;
  Ok(Json(page.into()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRes {
  pub message: &'static str,
  pub course_id: Uuid,
}

pub async fn create_course(
  State(app): State<Arc<AppState>>,
  Admin(admin): Admin,
  Json(req): Json<NewCourse>,
) -> Result<(StatusCode, Json<CreatedRes>)> {
  let course = app.sv().course.create(req).await?;
  info!("Admin {} created course {}", admin.email, course.id);

  Ok((
    StatusCode::CREATED,
    Json(CreatedRes { message: "created", course_id: course.id }),
  ))
}

pub async fn create_promo(
  State(app): State<Arc<AppState>>,
  Admin(admin): Admin,
  Json(req): Json<NewPromoCode>,
) -> Result<(StatusCode, Json<promo_code::Model>)> {
  let promo = app.sv().promo.create(req).await?;
  info!("Admin {} created promo code {}", admin.email, promo.code);

  Ok((StatusCode::CREATED, Json(promo)))
}

/// Promo code with its state evaluated at response time
#[derive(Debug, Serialize)]
pub struct PromoRes {
  #[serde(flatten)]
  pub promo: promo_code::Model,
  pub expired: bool,
  pub exhausted: bool,
  pub valid: bool,
}

impl PromoRes {
  fn at(promo: promo_code::Model, now: DateTime) -> Self {
    Self {
      expired: promo.is_expired(now),
      exhausted: promo.is_exhausted(),
      valid: promo.is_valid(now),
      promo,
    }
  }
}

pub async fn course_promos(
  State(app): State<Arc<AppState>>,
  _admin: Admin,
  Path(course_id): Path<Uuid>,
) -> Result<Json<Vec<PromoRes>>> {
  let now = Utc::now().naive_utc();
  let codes = app.sv().promo.for_course(course_id).await?;
  Ok(Json(codes.into_iter().map(|promo| PromoRes::at(promo, now)).collect()))
}

#[derive(Debug, Deserialize)]
pub struct ActiveReq {
  pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct ActiveRes {
  pub success: bool,
}

pub async fn set_promo_active(
  State(app): State<Arc<AppState>>,
  _admin: Admin,
  Path(code): Path<String>,
  Json(req): Json<ActiveReq>,
) -> Result<Json<ActiveRes>> {
  app.sv().promo.set_active(&code, req.active).await?;
  Ok(Json(ActiveRes { success: true }))
}

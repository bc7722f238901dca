//! Promo code activation and the learner's own courses

use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::extract::{Json, Path};
use crate::{
  entity::{LessonProgress, course, course_access, lesson},
  prelude::*,
  state::{AppState, CurrentUser},
  sv::promo::Redemption,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateReq {
  #[serde(default)]
  pub code: Option<String>,
  #[serde(default)]
  pub course_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRes {
  pub message: &'static str,
  pub course_id: Uuid,
  pub title: String,
}

impl From<Redemption> for ActivateRes {
  fn from(redemption: Redemption) -> Self {
    let message = match redemption {
      Redemption::Granted(_) => "granted",
      Redemption::AlreadyGranted(_) => "already granted",
    };
    let course = redemption.course();
    Self { message, course_id: course.id, title: course.title.clone() }
  }
}

pub async fn activate(
  State(app): State<Arc<AppState>>,
  user: CurrentUser,
  Json(req): Json<ActivateReq>,
) -> Result<Json<ActivateRes>> {
  let present = |field: Option<String>| field.filter(|s| !s.trim().is_empty());
  let (Some(code), Some(course_id)) = (present(req.code), present(req.course_id))
  else {
    return Err(Error::validation("Promo code and course id are required"));
  };

  let course_id = Uuid::parse_str(course_id.trim())
    .map_err(|_| Error::validation("Malformed course id"))?;

  let redemption = app.sv().promo.redeem(&code, course_id, user.id).await?;
  Ok(Json(redemption.into()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
  pub course_id: Uuid,
  pub title: String,
  pub thumbnail_url: String,
  pub granted_at: DateTime,
  pub last_accessed: DateTime,
  pub completed_lessons: usize,
}

pub async fn library(
  State(app): State<Arc<AppState>>,
  user: CurrentUser,
) -> Result<Json<Vec<LibraryEntry>>> {
  let grants = app.sv().access.by_user(user.id).await?;

  let entries = grants
    .into_iter()
    .map(|(grant, course)| LibraryEntry {
      course_id: course.id,
      title: course.title,
      thumbnail_url: course.thumbnail_url,
      granted_at: grant.granted_at,
      last_accessed: grant.last_accessed,
      completed_lessons: grant.progress.0.iter().filter(|p| p.completed).count(),
    })
    .collect();

  Ok(Json(entries))
}

#[derive(Debug, Serialize)]
pub struct OpenRes {
  pub course: course::Model,
  pub lessons: Vec<lesson::Model>,
  pub access: course_access::Model,
}

pub async fn open(
  State(app): State<Arc<AppState>>,
  user: CurrentUser,
  Path(course_id): Path<Uuid>,
) -> Result<Json<OpenRes>> {
  let opened = app.sv().access.open(user.id, course_id).await?;
  Ok(Json(OpenRes {
    course: opened.course,
    lessons: opened.lessons,
    access: opened.grant,
  }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReq {
  pub lesson_id: Uuid,
  #[serde(default)]
  pub watch_time_seconds: i64,
  #[serde(default)]
  pub completed: bool,
}

pub async fn progress(
  State(app): State<Arc<AppState>>,
  user: CurrentUser,
  Path(course_id): Path<Uuid>,
  Json(req): Json<ProgressReq>,
) -> Result<Json<LessonProgress>> {
  let entry = app
    .sv()
    .access
    .record_progress(
      user.id,
      course_id,
      req.lesson_id,
      req.watch_time_seconds,
      req.completed,
    )
    .await?;
  Ok(Json(entry))
}

//! Public course catalog

use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::extract::{Json, Path, Query};
use crate::{
  entity::{course, lesson},
  prelude::*,
  state::AppState,
  sv::course::{Page, Pagination},
};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
  #[serde(default = "PageQuery::first")]
  pub page: u64,
  #[serde(default = "PageQuery::default_limit")]
  pub limit: u64,
}

impl PageQuery {
  fn first() -> u64 {
    1
  }

  fn default_limit() -> u64 {
    10
  }
}

#[derive(Debug, Serialize)]
pub struct CoursesRes {
  pub courses: Vec<course::Model>,
  pub pagination: Pagination,
}

impl From<Page<course::Model>> for CoursesRes {
  fn from(page: Page<course::Model>) -> Self {
    Self { courses: page.items, pagination: page.pagination }
  }
}

pub async fn list(
  State(app): State<Arc<AppState>>,
  Query(query): Query<PageQuery>,
) -> Result<Json<CoursesRes>> {
  let page = app.sv().course.published(query.page, query.limit).await?;
  Ok(Json(page.into()))
}

/// Lesson listing without the video or attachments
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonOutline {
  pub id: Uuid,
  pub title: String,
  pub description: String,
  pub duration_seconds: i32,
  pub position: i32,
}

impl From<lesson::Model> for LessonOutline {
  fn from(lesson: lesson::Model) -> Self {
    Self {
      id: lesson.id,
      title: lesson.title,
      description: lesson.description,
      duration_seconds: lesson.duration_seconds,
      position: lesson.position,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct CourseRes {
  pub course: course::Model,
  pub lessons: Vec<LessonOutline>,
}

pub async fn detail(
  State(app): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CourseRes>> {
  let sv = app.sv();
  let course = sv
    .course
    .by_id(id)
    .await?
    .filter(|course| course.is_published)
    .ok_or(Error::CourseNotFound)?;

  let lessons = sv.course.lessons(id).await?;

  Ok(Json(CourseRes {
    course,
    lessons: lessons.into_iter().map(Into::into).collect(),
  }))
}

//! Error types for the course platform

use axum::{
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use derive_more::{Display, From};
use tracing::error;

/// Reasons a promo code cannot be used
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Promo {
  #[display("Promo code not found or inactive")]
  Invalid,
  #[display("Promo code has expired")]
  Expired,
  #[display("Promo code usage limit reached")]
  Exhausted,
  #[display("Promo code already exists")]
  Duplicate,
}

#[derive(Debug, Display, From)]
pub enum Error {
  /// Storage unreachable or failing; never recovered locally
  #[display("Database error: {_0}")]
  #[from]
  Database(sea_orm::DbErr),

  #[display("Authentication required")]
  Unauthenticated,

  #[display("Insufficient permissions")]
  Forbidden,

  #[display("Invalid credentials")]
  InvalidCredentials,

  #[display("User not found")]
  UserNotFound,

  #[display("Email already registered")]
  EmailTaken,

  #[display("{_0}")]
  Validation(String),

  #[display("{_0}")]
  #[from]
  Promo(Promo),

  #[display("Course not found")]
  CourseNotFound,

  #[display("Lesson not found")]
  LessonNotFound,

  #[display("No access to this course")]
  AccessDenied,

  #[display("Internal error: {_0}")]
  Internal(String),
}

impl std::error::Error for Error {}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Error::Database(_) | Error::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
      Error::Unauthenticated | Error::InvalidCredentials => {
        StatusCode::UNAUTHORIZED
      }
      Error::Forbidden | Error::AccessDenied => StatusCode::FORBIDDEN,
      Error::EmailTaken | Error::Promo(Promo::Duplicate) => StatusCode::CONFLICT,
      Error::Validation(_)
      | Error::Promo(Promo::Expired)
      | Error::Promo(Promo::Exhausted) => StatusCode::BAD_REQUEST,
      Error::Promo(Promo::Invalid)
      | Error::UserNotFound
      | Error::CourseNotFound
      | Error::LessonNotFound => StatusCode::NOT_FOUND,
    }
  }
}

// Malformed requests answer with the same `{success, error}` body as any
// other failure instead of axum's plain-text rejections.

impl From<JsonRejection> for Error {
  fn from(rejection: JsonRejection) -> Self {
    Self::Validation(rejection.body_text())
  }
}

impl From<QueryRejection> for Error {
  fn from(rejection: QueryRejection) -> Self {
    Self::Validation(rejection.body_text())
  }
}

impl From<PathRejection> for Error {
  fn from(rejection: PathRejection) -> Self {
    Self::Validation(rejection.body_text())
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      Error::Database(err) => {
        error!("Database failure: {err}");
        "Database error".to_string()
      }
      Error::Internal(err) => {
        error!("Internal failure: {err}");
        "Internal error".to_string()
      }
      other => other.to_string(),
    };

    let body = json::json!({
      "success": false,
      "error": message
    });

    (status, axum::Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

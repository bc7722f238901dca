use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use super::{auth::Bearer, extract::Json};
use crate::{
  entity::{Role, user},
  prelude::*,
  state::{AppState, CurrentUser},
  sv::user::Registration,
};

pub async fn health() -> &'static str {
  "OK"
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReq {
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRes {
  pub id: Uuid,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub role: Role,
}

impl From<user::Model> for UserRes {
  fn from(user: user::Model) -> Self {
    Self {
      id: user.id,
      first_name: user.first_name,
      last_name: user.last_name,
      email: user.email,
      role: user.role,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct RegisterRes {
  pub success: bool,
  pub user: UserRes,
}

pub async fn register(
  State(app): State<Arc<AppState>>,
  Json(req): Json<RegisterReq>,
) -> Result<(StatusCode, Json<RegisterRes>)> {
  let role =
    if app.config.is_admin_email(&req.email) { Role::Admin } else { Role::User };

  let user = app
    .sv()
    .user
    .register(Registration {
      email: req.email,
      password: req.password,
      first_name: req.first_name,
      last_name: req.last_name,
      role,
    })
    .await?;

  info!("Registered user {} ({})", user.email, user.id);
  Ok((StatusCode::CREATED, Json(RegisterRes { success: true, user: user.into() })))
}

#[derive(Debug, Deserialize)]
pub struct LoginReq {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRes {
  pub success: bool,
  pub token: Uuid,
  pub user: UserRes,
}

pub async fn login(
  State(app): State<Arc<AppState>>,
  Json(req): Json<LoginReq>,
) -> Result<Json<LoginRes>> {
  if req.email.trim().is_empty() || req.password.is_empty() {
    return Err(Error::validation("Email and password are required"));
  }

  let sv = app.sv();
  let mut user = sv.user.authenticate(&req.email, &req.password).await?;

  if user.role != Role::Admin && app.config.is_admin_email(&user.email) {
    user = sv.user.set_role(user.id, Role::Admin).await?;
  }

  let token = app.login(CurrentUser {
    id: user.id,
    email: user.email.clone(),
    role: user.role,
  });

  Ok(Json(LoginRes { success: true, token, user: user.into() }))
}

#[derive(Debug, Serialize)]
pub struct LogoutRes {
  pub success: bool,
}

pub async fn logout(
  State(app): State<Arc<AppState>>,
  Bearer(token): Bearer,
) -> Json<LogoutRes> {
  app.logout(&token);
  Json(LogoutRes { success: true })
}

//! Bearer-token identity extractors

use axum::{
  extract::FromRequestParts,
  http::{header, request::Parts},
};

use crate::{
  prelude::*,
  state::{AppState, CurrentUser},
};

fn bearer_token(parts: &Parts) -> Option<Uuid> {
  let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let token = value.strip_prefix("Bearer ")?;
  Uuid::parse_str(token.trim()).ok()
}

/// Raw session token, valid or not
pub struct Bearer(pub Uuid);

impl FromRequestParts<Arc<AppState>> for Bearer {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    _app: &Arc<AppState>,
  ) -> Result<Self> {
    bearer_token(parts).map(Bearer).ok_or(Error::Unauthenticated)
  }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    let token = bearer_token(parts).ok_or(Error::Unauthenticated)?;
    app.session(&token).ok_or(Error::Unauthenticated)
  }
}

/// Authenticated user holding the admin role
pub struct Admin(pub CurrentUser);

impl FromRequestParts<Arc<AppState>> for Admin {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    let user = CurrentUser::from_request_parts(parts, app).await?;
    if !user.is_admin() {
      return Err(Error::Forbidden);
    }
    Ok(Admin(user))
  }
}

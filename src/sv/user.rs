use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{SaltString, rand_core::OsRng},
};
use sea_orm::SqlErr;

use crate::{
  entity::{Role, user},
  prelude::*,
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

#[derive(Debug, Clone)]
pub struct Registration {
  pub email: String,
  pub password: String,
  pub first_name: String,
  pub last_name: String,
  pub role: Role,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn register(&self, reg: Registration) -> Result<user::Model> {
    let email = reg.email.trim().to_lowercase();
    let first_name = reg.first_name.trim().to_string();
    let last_name = reg.last_name.trim().to_string();

    if email.is_empty()
      || reg.password.is_empty()
      || first_name.is_empty()
      || last_name.is_empty()
    {
      return Err(Error::validation("All fields are required"));
    }
    if reg.password.chars().count() < MIN_PASSWORD_LEN {
      return Err(Error::validation(format!(
        "Password must be at least {MIN_PASSWORD_LEN} characters"
      )));
    }

    if self.by_email(&email).await?.is_some() {
      return Err(Error::EmailTaken);
    }

    let password_hash = hash_password(reg.password).await?;
    let now = Utc::now().naive_utc();

    let user = user::ActiveModel {
      id: Set(Uuid::new_v4()),
      email: Set(email),
      password_hash: Set(password_hash),
      first_name: Set(first_name),
      last_name: Set(last_name),
      role: Set(reg.role),
      registered_at: Set(now),
      last_login: Set(now),
    };

    // a concurrent registration may win the unique index
    match user.insert(self.db).await {
      Ok(user) => Ok(user),
      Err(err)
        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
      {
        Err(Error::EmailTaken)
      }
      Err(err) => Err(err.into()),
    }
  }

  /// Verifies credentials and stamps `last_login`.
  pub async fn authenticate(
    &self,
    email: &str,
    password: &str,
  ) -> Result<user::Model> {
    let email = email.trim().to_lowercase();
    let user = self.by_email(&email).await?.ok_or(Error::InvalidCredentials)?;

    if !verify_password(password.to_string(), user.password_hash.clone())
      .await?
    {
      return Err(Error::InvalidCredentials);
    }

    let now = Utc::now().naive_utc();
    let user = user::ActiveModel { last_login: Set(now), ..user.into() }
      .update(self.db)
      .await?;

    Ok(user)
  }

  pub async fn by_id(&self, id: Uuid) -> Result<Option<user::Model>> {
    Ok(user::Entity::find_by_id(id).one(self.db).await?)
  }

  pub async fn by_email(&self, email: &str) -> Result<Option<user::Model>> {
    let user = user::Entity::find()
      .filter(user::Column::Email.eq(email))
      .one(self.db)
      .await?;
    Ok(user)
  }

  pub async fn set_role(&self, id: Uuid, role: Role) -> Result<user::Model> {
    let user = self.by_id(id).await?.ok_or(Error::UserNotFound)?;
    if user.role == role {
      return Ok(user);
    }

    Ok(
      user::ActiveModel { role: Set(role), ..user.into() }
        .update(self.db)
        .await?,
    )
  }
}

async fn hash_password(password: String) -> Result<String> {
  tokio::task::spawn_blocking(move || {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map(|hash| hash.to_string())
      .map_err(|err| Error::Internal(format!("password hashing: {err}")))
  })
  .await
  .map_err(|err| Error::Internal(err.to_string()))?
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
  tokio::task::spawn_blocking(move || {
    let parsed = PasswordHash::new(&hash)
      .map_err(|err| Error::Internal(format!("stored hash: {err}")))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
  })
  .await
  .map_err(|err| Error::Internal(err.to_string()))?
}

#[cfg(test)]
pub(crate) fn registration(email: &str) -> Registration {
  Registration {
    email: email.into(),
    password: "secret-password".into(),
    first_name: "Ada".into(),
    last_name: "Lovelace".into(),
    role: Role::User,
  }
}

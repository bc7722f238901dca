use std::{collections::HashSet, env};

use crate::{entity::Role, prelude::*, sv};

/// Identity attached to an authenticated request
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CurrentUser {
  pub id: Uuid,
  pub email: String,
  pub role: Role,
}

impl CurrentUser {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }
}

#[derive(Debug, Clone)]
pub struct Session {
  pub user: CurrentUser,
  pub expires_at: DateTime,
}

pub type Sessions = DashMap<Uuid, Session>;

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  pub session_lifetime: Duration,
  pub rate_per_second: u64,
  pub rate_burst: u32,
  /// Emails that are promoted to admins on registration and login
  pub admins: HashSet<String>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: String::from("sqlite:courses.db?mode=rwc"),
      port: 3000,
      session_lifetime: Duration::from_secs(30 * 24 * 3600),
      rate_per_second: 2,
      rate_burst: 100,
      admins: HashSet::new(),
    }
  }
}

impl Config {
  /// Reads overrides from the environment, falling back to defaults.
  pub fn from_env() -> anyhow::Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Same as [`Config::from_env`] over any key lookup.
  pub fn from_lookup(
    var: impl Fn(&str) -> Option<String>,
  ) -> anyhow::Result<Self> {
    let mut config = Self::default();

    if let Some(url) = var("DATABASE_URL") {
      config.database_url = url;
    }
    if let Some(port) = var("PORT") {
      config.port = port.parse().context("PORT must be a port number")?;
    }
    if let Some(lifetime) = var("SESSION_LIFETIME") {
      config.session_lifetime = humantime::parse_duration(&lifetime)
        .context("SESSION_LIFETIME must be a duration like `30d`")?;
    }
    if let Some(rate) = var("RATE_LIMIT_PER_SECOND") {
      config.rate_per_second =
        rate.parse().context("RATE_LIMIT_PER_SECOND must be an integer")?;
    }
    if let Some(burst) = var("RATE_LIMIT_BURST") {
      config.rate_burst =
        burst.parse().context("RATE_LIMIT_BURST must be an integer")?;
    }

    if let Some(admins) = var("ADMIN_EMAILS") {
      config.admins = admins
        .split(',')
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect();
    }

    Ok(config)
  }

  pub fn is_admin_email(&self, email: &str) -> bool {
    self.admins.contains(&email.trim().to_lowercase())
  }
}

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub course: sv::Course<'a>,
  pub promo: sv::Promo<'a>,
  pub access: sv::Access<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub sessions: Sessions,
  pub config: Config,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    info!("Connecting to database...");
    let db = Database::connect(config.database_url.as_str())
      .await
      .context("Failed to connect to database")?;

    info!("Running migrations...");
    Migrator::up(&db, None).await.context("Failed to run migrations")?;

    Ok(Self::with_db(db, config))
  }

  pub fn with_db(db: DatabaseConnection, config: Config) -> Self {
    Self { db, sessions: DashMap::new(), config }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db),
      course: sv::Course::new(&self.db),
      promo: sv::Promo::new(&self.db),
      access: sv::Access::new(&self.db),
    }
  }

  /// Opens a session for `user` and returns its bearer token.
  pub fn login(&self, user: CurrentUser) -> Uuid {
    let token = Uuid::new_v4();
    let lifetime = TimeDelta::from_std(self.config.session_lifetime)
      .unwrap_or(TimeDelta::MAX);
    let expires_at = Utc::now()
      .naive_utc()
      .checked_add_signed(lifetime)
      .unwrap_or(DateTime::MAX);

    self.sessions.insert(token, Session { user, expires_at });
    token
  }

  pub fn session(&self, token: &Uuid) -> Option<CurrentUser> {
    let now = Utc::now().naive_utc();
    let session = self.sessions.get(token)?;

    if session.expires_at <= now {
      drop(session);
      self.sessions.remove(token);
      return None;
    }

    Some(session.user.clone())
  }

  pub fn logout(&self, token: &Uuid) {
    self.sessions.remove(token);
  }

  pub fn gc_sessions(&self) {
    let now = Utc::now().naive_utc();
    self.sessions.retain(|_token, session| session.expires_at > now);
  }
}

pub mod access;
pub mod course;
pub mod promo;
pub mod user;

pub use access::Access;
pub use course::Course;
pub use promo::Promo;
pub use user::User;

/// Fresh in-memory database with the full schema applied.
///
/// Pinned to a single connection: every pooled sqlite `:memory:` connection
/// would otherwise see its own empty database.
#[cfg(test)]
pub(crate) async fn test_db() -> sea_orm::DatabaseConnection {
  use sea_orm::ConnectOptions;

  use crate::prelude::*;

  let mut opt = ConnectOptions::new("sqlite::memory:");
  opt.max_connections(1).min_connections(1).sqlx_logging(false);

  let db = Database::connect(opt).await.unwrap();
  Migrator::up(&db, None).await.unwrap();
  db
}

pub use std::{sync::Arc, time::Duration};

pub use anyhow::Context;
pub use async_trait::async_trait;
pub use chrono::{NaiveDateTime as DateTime, TimeDelta, Utc};
pub use dashmap::DashMap;
pub use migration::{Migrator, MigratorTrait};
pub use sea_orm::{
  ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait,
  PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
pub use tokio::time;
pub use tracing::{debug, error, info, warn};
pub use uuid::Uuid;

pub use crate::error::{Error, Result};

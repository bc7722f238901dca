use crate::{
  entity::{LessonProgress, course, course_access, lesson},
  prelude::*,
  sv,
};

/// Concurrent progress reports one write may lose to before giving up
const MAX_PROGRESS_ATTEMPTS: usize = 16;

pub struct Access<'a> {
  db: &'a DatabaseConnection,
}

/// A granted course as seen by its learner
#[derive(Debug, Clone)]
pub struct Opened {
  pub course: course::Model,
  pub lessons: Vec<lesson::Model>,
  pub grant: course_access::Model,
}

impl<'a> Access<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn grant(
    &self,
    user_id: Uuid,
    course_id: Uuid,
  ) -> Result<Option<course_access::Model>> {
    let grant = course_access::Entity::find()
      .filter(course_access::Column::UserId.eq(user_id))
      .filter(course_access::Column::CourseId.eq(course_id))
      .one(self.db)
      .await?;
    Ok(grant)
  }

  pub async fn by_user(
    &self,
    user_id: Uuid,
  ) -> Result<Vec<(course_access::Model, course::Model)>> {
    let grants = course_access::Entity::find()
      .filter(course_access::Column::UserId.eq(user_id))
      .order_by_desc(course_access::Column::GrantedAt)
      .find_also_related(course::Entity)
      .all(self.db)
      .await?;

    Ok(
      grants
        .into_iter()
        .filter_map(|(grant, course)| course.map(|course| (grant, course)))
        .collect(),
    )
  }

  /// Loads a granted course with its lessons and stamps `last_accessed`.
  pub async fn open(&self, user_id: Uuid, course_id: Uuid) -> Result<Opened> {
    let grant =
      self.grant(user_id, course_id).await?.ok_or(Error::AccessDenied)?;

    let courses = sv::Course::new(self.db);
    let course = courses.by_id(course_id).await?.ok_or(Error::CourseNotFound)?;
    let lessons = courses.lessons(course_id).await?;

    let grant = course_access::ActiveModel {
      last_accessed: Set(Utc::now().naive_utc()),
      ..grant.into()
    }
    .update(self.db)
    .await?;

    Ok(Opened { course, lessons, grant })
  }

  /// Merges a viewing report into the grant's progress.
  ///
  /// The progress column is rewritten as a whole, so the write is a
  /// compare-and-swap on `last_accessed` and is retried when a concurrent
  /// report got there first.
  pub async fn record_progress(
    &self,
    user_id: Uuid,
    course_id: Uuid,
    lesson_id: Uuid,
    watch_seconds: i64,
    completed: bool,
  ) -> Result<LessonProgress> {
    self.grant(user_id, course_id).await?.ok_or(Error::AccessDenied)?;

    lesson::Entity::find_by_id(lesson_id)
      .filter(lesson::Column::CourseId.eq(course_id))
      .one(self.db)
      .await?
      .ok_or(Error::LessonNotFound)?;

    for attempt in 1..=MAX_PROGRESS_ATTEMPTS {
      let grant =
        self.grant(user_id, course_id).await?.ok_or(Error::AccessDenied)?;

      // strictly newer, so the swap below can never match a stale reader
      let now = Utc::now()
        .naive_utc()
        .max(grant.last_accessed + TimeDelta::microseconds(1));
      let mut progress = grant.progress.clone();
      let entry =
        progress.record(lesson_id, watch_seconds, completed, now).clone();

      let updated = course_access::Entity::update_many()
        .set(course_access::ActiveModel {
          progress: Set(progress),
          last_accessed: Set(now),
          ..Default::default()
        })
        .filter(course_access::Column::Id.eq(grant.id))
        .filter(course_access::Column::LastAccessed.eq(grant.last_accessed))
        .exec(self.db)
        .await?;

      if updated.rows_affected == 1 {
        return Ok(entry);
      }
      debug!(%user_id, %course_id, attempt, "Progress write raced, retrying");
    }

    Err(Error::Internal(format!(
      "progress for course {course_id} kept changing under user {user_id}"
    )))
  }
}

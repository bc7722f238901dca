use serde::{Deserialize, Serialize};

use crate::{
  entity::{Labels, Material, Materials, course, lesson},
  prelude::*,
};

pub const MAX_PAGE_SIZE: u64 = 100;
/// Keeps `(page - 1) * limit` within a signed 64-bit sql offset
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;

pub struct Course<'a> {
  db: &'a DatabaseConnection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewLesson {
  pub title: String,
  pub description: String,
  #[serde(alias = "youtubeVideoId")]
  pub video_url: String,
  pub duration: Option<i32>,
  pub order: Option<i32>,
  pub materials: Vec<Material>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCourse {
  pub title: String,
  pub description: String,
  pub thumbnail_url: String,
  pub categories: Vec<String>,
  pub tags: Vec<String>,
  pub lessons: Vec<NewLesson>,
  pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
  pub total: u64,
  pub page: u64,
  pub limit: u64,
  pub pages: u64,
}

impl Pagination {
  /// Clamps `page` to 1..=MAX_PAGE and `limit` to 1..=MAX_PAGE_SIZE.
  pub fn new(page: u64, limit: u64, total: u64) -> Self {
    let page = page.clamp(1, MAX_PAGE);
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    Self { total, page, limit, pages: total.div_ceil(limit) }
  }

  pub fn skip(&self) -> u64 {
    (self.page - 1) * self.limit
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub pagination: Pagination,
}

impl<'a> Course<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, new: NewCourse) -> Result<course::Model> {
    if new.title.trim().is_empty()
      || new.description.trim().is_empty()
      || new.thumbnail_url.trim().is_empty()
    {
      return Err(Error::validation("Course title, description and thumbnail are required"));
    }
    if new.lessons.is_empty() {
      return Err(Error::validation("Course must contain at least one lesson"));
    }
    if new.lessons.iter().any(|l| {
      l.title.trim().is_empty()
        || l.description.trim().is_empty()
        || l.video_url.trim().is_empty()
    }) {
      return Err(Error::validation(
        "Every lesson needs a title, description and video",
      ));
    }

    let now = Utc::now().naive_utc();
    let course_id = Uuid::new_v4();
    let txn = self.db.begin().await?;

    let course = course::ActiveModel {
      id: Set(course_id),
      title: Set(new.title.trim().to_string()),
      description: Set(new.description),
      thumbnail_url: Set(new.thumbnail_url),
      categories: Set(Labels(new.categories)),
      tags: Set(Labels(new.tags)),
      is_published: Set(new.is_published.unwrap_or(true)),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let lessons: Vec<_> = new
      .lessons
      .into_iter()
      .zip(1..)
      .map(|(l, idx)| lesson::ActiveModel {
        id: Set(Uuid::new_v4()),
        course_id: Set(course_id),
        title: Set(l.title.trim().to_string()),
        description: Set(l.description),
        video_url: Set(l.video_url),
        duration_seconds: Set(l.duration.unwrap_or(0).max(0)),
        position: Set(l.order.unwrap_or(idx)),
        materials: Set(Materials(l.materials)),
      })
      .collect();

    lesson::Entity::insert_many(lessons).exec(&txn).await?;
    txn.commit().await?;

    info!("Course `{}` created ({})", course.title, course.id);
    Ok(course)
  }

  pub async fn by_id(&self, id: Uuid) -> Result<Option<course::Model>> {
    Ok(course::Entity::find_by_id(id).one(self.db).await?)
  }

  pub async fn lessons(&self, course_id: Uuid) -> Result<Vec<lesson::Model>> {
    let lessons = lesson::Entity::find()
      .filter(lesson::Column::CourseId.eq(course_id))
      .order_by_asc(lesson::Column::Position)
      .all(self.db)
      .await?;
    Ok(lessons)
  }

  /// Newest first, every course regardless of publication.
  pub async fn list(&self, page: u64, limit: u64) -> Result<Page<course::Model>> {
    self.page(course::Entity::find(), page, limit).await
  }

  /// Newest first, published courses only.
  pub async fn published(
    &self,
    page: u64,
    limit: u64,
  ) -> Result<Page<course::Model>> {
    let query =
      course::Entity::find().filter(course::Column::IsPublished.eq(true));
    self.page(query, page, limit).await
  }

  async fn page(
    &self,
    query: sea_orm::Select<course::Entity>,
    page: u64,
    limit: u64,
  ) -> Result<Page<course::Model>> {
    let total = query.clone().count(self.db).await?;
    let pagination = Pagination::new(page, limit, total);

    let items = query
      .order_by_desc(course::Column::CreatedAt)
      .offset(pagination.skip())
      .limit(pagination.limit)
      .all(self.db)
      .await?;

    Ok(Page { items, pagination })
  }
}

#[cfg(test)]
pub(crate) fn sample(title: &str) -> NewCourse {
  NewCourse {
    title: title.into(),
    description: "Learn things".into(),
    thumbnail_url: "https://img.example.com/t.png".into(),
    categories: vec!["rust".into()],
    tags: vec!["beginner".into()],
    lessons: vec![
      NewLesson {
        title: "Intro".into(),
        description: "Hello".into(),
        video_url: "dQw4w9WgXcQ".into(),
        duration: Some(120),
        ..Default::default()
      },
      NewLesson {
        title: "Ownership".into(),
        description: "Borrowing".into(),
        video_url: "oHg5SJYRHA0".into(),
        ..Default::default()
      },
    ],
    is_published: None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv;

  #[test]
  fn pagination_math() {
    let p = Pagination::new(3, 10, 25);
    assert_eq!(p.skip(), 20);
    assert_eq!(p.pages, 3);

    let p = Pagination::new(0, 0, 0);
    assert_eq!((p.page, p.limit, p.pages), (1, 1, 0));

    assert_eq!(Pagination::new(1, 10_000, 5).limit, MAX_PAGE_SIZE);

    let p = Pagination::new(u64::MAX, u64::MAX, 5);
    assert_eq!(p.page, MAX_PAGE);
    assert!(p.skip() <= i64::MAX as u64);
  }

  #[tokio::test]
  async fn test_create_course_with_lessons() {
    let db = sv::test_db().await;
    let sv = Course::new(&db);

    let course = sv.create(sample("Rust 101")).await.unwrap();
    assert!(course.is_published);
    assert_eq!(course.tags, Labels(vec!["beginner".into()]));

    let lessons = sv.lessons(course.id).await.unwrap();
    let positions: Vec<_> = lessons.iter().map(|l| l.position).collect();
    assert_eq!(positions, vec![1, 2]);
    assert_eq!(lessons[0].duration_seconds, 120);
  }

  #[tokio::test]
  async fn test_create_course_validation() {
    let db = sv::test_db().await;
    let sv = Course::new(&db);

    let no_lessons = NewCourse { lessons: vec![], ..sample("Empty") };
    assert!(matches!(sv.create(no_lessons).await, Err(Error::Validation(_))));

    let mut bad_lesson = sample("Broken");
    bad_lesson.lessons[1].video_url.clear();
    assert!(matches!(sv.create(bad_lesson).await, Err(Error::Validation(_))));

    assert_eq!(sv.list(1, 10).await.unwrap().pagination.total, 0);
  }

  #[tokio::test]
  async fn test_list_pages_newest_first() {
    let db = sv::test_db().await;
    let sv = Course::new(&db);

    for n in 0..5 {
      sv.create(sample(&format!("Course {n}"))).await.unwrap();
      time::sleep(Duration::from_millis(5)).await;
    }
    sv.create(NewCourse { is_published: Some(false), ..sample("Draft") })
      .await
      .unwrap();

    let first = sv.list(1, 4).await.unwrap();
    assert_eq!(first.pagination.total, 6);
    assert_eq!(first.pagination.pages, 2);
    assert_eq!(first.items[0].title, "Draft");

    let second = sv.list(2, 4).await.unwrap();
    let titles: Vec<_> = second.items.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Course 1", "Course 0"]);

    let public = sv.published(1, 10).await.unwrap();
    assert_eq!(public.pagination.total, 5);
    assert!(public.items.iter().all(|c| c.is_published));
  }
}

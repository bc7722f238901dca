//! SeaORM entity definitions

pub mod course;
pub mod course_access;
pub mod lesson;
pub mod promo_code;
pub mod user;

pub use course::Labels;
pub use course_access::{LessonProgress, Progress};
pub use lesson::{Material, Materials};
pub use user::Role;

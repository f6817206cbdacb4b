pub mod class;
pub mod lesson;
pub mod main_topic;
pub mod progress;
pub mod timestamps;
pub mod user;
pub mod views;

pub use class::Class;
pub use lesson::Lesson;
pub use main_topic::{MainTopic, DEFAULT_ICON};
pub use progress::UserProgress;
pub use user::User;
pub use views::{ClassWithLessons, LessonWithProgress, MainWithClasses};

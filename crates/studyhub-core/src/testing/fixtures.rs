//! Payload builders and a small content scaffold for tests

use crate::commands::{NewClass, NewLesson, NewMainTopic, NewUser};
use crate::errors::Result;
use crate::model::{Class, Lesson, MainTopic, User};
use crate::repository::Repository;

pub fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        full_name: "Test User".to_string(),
        is_admin: false,
    }
}

pub fn new_main(title: &str, created_by: &str) -> NewMainTopic {
    NewMainTopic {
        title: title.to_string(),
        description: None,
        icon: None,
        order: 0,
        created_by: created_by.to_string(),
    }
}

pub fn new_class(title: &str, main_id: &str, created_by: &str) -> NewClass {
    NewClass {
        title: title.to_string(),
        description: None,
        main_id: main_id.to_string(),
        parent_class_id: None,
        order: 0,
        created_by: created_by.to_string(),
    }
}

pub fn new_sub_class(title: &str, parent: &Class, created_by: &str) -> NewClass {
    NewClass {
        parent_class_id: Some(parent.id.clone()),
        ..new_class(title, &parent.main_id, created_by)
    }
}

/// A published lesson with placeholder content
pub fn new_lesson(title: &str, class_id: &str, created_by: &str) -> NewLesson {
    NewLesson {
        title: title.to_string(),
        content: "<p>Lesson body</p>".to_string(),
        excerpt: None,
        bible_reference: None,
        image_url: None,
        audio_url: None,
        duration: None,
        class_id: class_id.to_string(),
        order: 0,
        is_published: true,
        created_by: created_by.to_string(),
    }
}

pub fn new_draft(title: &str, class_id: &str, created_by: &str) -> NewLesson {
    NewLesson {
        is_published: false,
        ..new_lesson(title, class_id, created_by)
    }
}

/// One user, one main topic, one top-level class
#[derive(Debug, Clone)]
pub struct Scaffold {
    pub user: User,
    pub main: MainTopic,
    pub class: Class,
}

impl Scaffold {
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn create(repo: &dyn Repository, email: &str) -> Result<Self> {
        let user = repo.create_user(new_user(email)).await?;
        let main = repo.create_main(new_main("Test", &user.id)).await?;
        let class = repo
            .create_class(new_class("Class", &main.id, &user.id))
            .await?;
        Ok(Self { user, main, class })
    }

    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn lesson(&self, repo: &dyn Repository, title: &str) -> Result<Lesson> {
        repo.create_lesson(new_lesson(title, &self.class.id, &self.user.id))
            .await
    }
}

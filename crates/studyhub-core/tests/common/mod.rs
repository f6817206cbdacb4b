use studyhub_core::commands::{NewClass, NewLesson, NewMainTopic, NewUser};
use studyhub_core::{Class, Lesson, MainTopic, MemoryRepository, Repository, User};

#[allow(dead_code)]
pub fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        full_name: "Test User".to_string(),
        is_admin: false,
    }
}

/// A repository holding one user, one main topic and one class
#[allow(dead_code)]
pub async fn scaffold() -> (MemoryRepository, User, MainTopic, Class) {
    let repo = MemoryRepository::new();
    let user = repo.create_user(new_user("owner@example.com")).await.unwrap();
    let main = repo
        .create_main(NewMainTopic {
            title: "Test".to_string(),
            description: None,
            icon: None,
            order: 0,
            created_by: user.id.clone(),
        })
        .await
        .unwrap();
    let class = repo
        .create_class(NewClass {
            title: "Class".to_string(),
            description: None,
            main_id: main.id.clone(),
            parent_class_id: None,
            order: 0,
            created_by: user.id.clone(),
        })
        .await
        .unwrap();
    (repo, user, main, class)
}

#[allow(dead_code)]
pub async fn create_lesson(repo: &dyn Repository, class: &Class, title: &str) -> Lesson {
    repo.create_lesson(NewLesson {
        title: title.to_string(),
        content: format!("<p>{}</p>", title),
        excerpt: None,
        bible_reference: None,
        image_url: None,
        audio_url: None,
        duration: None,
        class_id: class.id.clone(),
        order: 0,
        is_published: true,
        created_by: class.created_by.clone(),
    })
    .await
    .unwrap()
}

//! Sample content for fresh installations
//!
//! Creates an admin account, one main topic with two classes and two
//! published lessons. Running it again is a no-op once the admin exists.

use serde::Serialize;

use crate::commands::{NewClass, NewLesson, NewMainTopic, NewUser};
use crate::errors::Result;
use crate::repository::Repository;

pub const ADMIN_EMAIL: &str = "admin@biblestudyhub.com";

/// What a seeding run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SeedOutcome {
    /// Sample content was written
    Seeded {
        admin_id: String,
        main_id: String,
        class_ids: Vec<String>,
        lesson_ids: Vec<String>,
    },
    /// The admin account already exists; nothing was written
    AlreadySeeded { admin_id: String },
}

struct SampleLesson {
    title: &'static str,
    content: &'static str,
    excerpt: &'static str,
    bible_reference: &'static str,
    duration: i32,
}

const ABRAHAM: SampleLesson = SampleLesson {
    title: "Abraham: The Father of Faith",
    content: "<h2>Called out of Ur</h2>\
        <p>Abraham left his homeland on nothing but a promise. \
        He did not know where he was going, only who had called him.</p>\
        <h2>Waiting on the promise</h2>\
        <p>Years passed before Isaac was born. Abraham's story shows faith \
        that keeps trusting while the promise is still unseen.</p>",
    excerpt: "How Abraham's trust in God's promise made him the father of faith.",
    bible_reference: "Genesis 12:1-9",
    duration: 15,
};

const MOSES: SampleLesson = SampleLesson {
    title: "Moses: The Reluctant Deliverer",
    content: "<h2>The burning bush</h2>\
        <p>Moses met God in the wilderness and was sent back to Egypt, \
        a task he felt unfit for.</p>\
        <h2>Leading the people</h2>\
        <p>Through plagues, the sea crossing and the desert years, Moses \
        learned to lead by depending on God rather than himself.</p>",
    excerpt: "God's call to an unlikely leader and the road out of Egypt.",
    bible_reference: "Exodus 3:1-15",
    duration: 20,
};

/// Write the sample content unless it is already present
///
/// # Errors
///
/// Propagates any repository failure; content written before the failure
/// is left in place.
pub async fn seed_sample_content(repo: &dyn Repository) -> Result<SeedOutcome> {
    if let Some(admin) = repo.get_user_by_email(ADMIN_EMAIL).await? {
        return Ok(SeedOutcome::AlreadySeeded { admin_id: admin.id });
    }

    let admin = repo
        .create_user(NewUser {
            email: ADMIN_EMAIL.to_string(),
            full_name: "Admin User".to_string(),
            is_admin: true,
        })
        .await?;

    let main = repo
        .create_main(NewMainTopic {
            title: "People of God in the Bible".to_string(),
            description: Some(
                "Study the lives of biblical figures and what their stories teach".to_string(),
            ),
            icon: Some("fas fa-users".to_string()),
            order: 1,
            created_by: admin.id.clone(),
        })
        .await?;

    let mut class_ids = Vec::new();
    for (order, (title, description)) in [
        (
            "Righteous People",
            "Men and women who walked faithfully with God",
        ),
        ("Wicked People", "Cautionary lives that turned away from God"),
    ]
    .into_iter()
    .enumerate()
    {
        let class = repo
            .create_class(NewClass {
                title: title.to_string(),
                description: Some(description.to_string()),
                main_id: main.id.clone(),
                parent_class_id: None,
                order: order as i32 + 1,
                created_by: admin.id.clone(),
            })
            .await?;
        class_ids.push(class.id);
    }

    let mut lesson_ids = Vec::new();
    for (order, sample) in [ABRAHAM, MOSES].into_iter().enumerate() {
        let lesson = repo
            .create_lesson(NewLesson {
                title: sample.title.to_string(),
                content: sample.content.to_string(),
                excerpt: Some(sample.excerpt.to_string()),
                bible_reference: Some(sample.bible_reference.to_string()),
                image_url: None,
                audio_url: None,
                duration: Some(sample.duration),
                class_id: class_ids[0].clone(),
                order: order as i32 + 1,
                is_published: true,
                created_by: admin.id.clone(),
            })
            .await?;
        lesson_ids.push(lesson.id);
    }

    Ok(SeedOutcome::Seeded {
        admin_id: admin.id,
        main_id: main.id,
        class_ids,
        lesson_ids,
    })
}

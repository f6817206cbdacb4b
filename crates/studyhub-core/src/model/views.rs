//! Hydrated read models
//!
//! These are assembled on read from flat rows; nothing here is stored.

use serde::{Deserialize, Serialize};

use super::{Class, Lesson, MainTopic, UserProgress};

/// A lesson merged with one user's progress
///
/// `progress` is `None` when the user has no record for the lesson, or when
/// the read had no user context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonWithProgress {
    #[serde(flatten)]
    pub lesson: Lesson,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<UserProgress>,
}

impl LessonWithProgress {
    pub fn new(lesson: Lesson, progress: Option<UserProgress>) -> Self {
        Self { lesson, progress }
    }
}

/// A class with its lessons and nested sub-classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassWithLessons {
    #[serde(flatten)]
    pub class: Class,
    pub lessons: Vec<LessonWithProgress>,
    /// `None` when the class has no sub-classes, never an empty vector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_classes: Option<Vec<ClassWithLessons>>,
}

impl ClassWithLessons {
    /// Iterate this class and every nested sub-class, depth first
    pub fn walk(&self) -> Vec<&ClassWithLessons> {
        let mut out = vec![self];
        for sub in self.sub_classes.iter().flatten() {
            out.extend(sub.walk());
        }
        out
    }
}

/// A main topic with its fully hydrated top-level classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainWithClasses {
    #[serde(flatten)]
    pub main: MainTopic,
    pub classes: Vec<ClassWithLessons>,
}

impl MainWithClasses {
    /// Every class in the tree, top-level and nested
    pub fn all_classes(&self) -> Vec<&ClassWithLessons> {
        self.classes.iter().flat_map(|c| c.walk()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::timestamps;

    fn class(id: &str) -> Class {
        Class {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            main_id: "m1".to_string(),
            parent_class_id: None,
            order: 0,
            created_by: "u1".to_string(),
            created_at: timestamps::now(),
        }
    }

    #[test]
    fn test_absent_sub_classes_are_not_serialized() {
        let view = ClassWithLessons {
            class: class("c1"),
            lessons: vec![],
            sub_classes: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("subClasses").is_none());
        assert_eq!(json["mainId"], "m1");
    }

    #[test]
    fn test_walk_visits_nested_classes() {
        let inner = ClassWithLessons {
            class: class("c2"),
            lessons: vec![],
            sub_classes: None,
        };
        let outer = ClassWithLessons {
            class: class("c1"),
            lessons: vec![],
            sub_classes: Some(vec![inner]),
        };
        let ids: Vec<&str> = outer.walk().iter().map(|c| c.class.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }
}

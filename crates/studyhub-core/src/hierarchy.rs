//! Read-time assembly of the content tree
//!
//! Rows are stored flat (arena); this module indexes them by parent and
//! builds the nested views. Every backend loads flat, already ordered rows
//! and hands them to [`Hierarchy`], so tree shape and ordering rules live in
//! one place.
//!
//! # Invariants
//! - input slices are already in sibling order (`order`, then insertion);
//! - input lessons are already filtered for visibility;
//! - a class only ever contains sub-classes of the same main topic;
//! - `sub_classes` is `None` rather than an empty vector;
//! - a cyclic `parent_class_id` chain is cut at the first repeated class.

use std::collections::{HashMap, HashSet};

use crate::model::{
    Class, ClassWithLessons, Lesson, LessonWithProgress, MainTopic, MainWithClasses,
    UserProgress,
};

/// Flat rows of one scope (a main topic, or everything) plus an index
#[derive(Debug, Default)]
pub struct Hierarchy {
    classes: Vec<Class>,
    lessons: Vec<Lesson>,
    /// lesson id -> the reading user's progress
    progress: HashMap<String, UserProgress>,
    /// parent class id -> indices into `classes`
    children: HashMap<String, Vec<usize>>,
    /// class id -> indices into `lessons`
    lessons_by_class: HashMap<String, Vec<usize>>,
}

impl Hierarchy {
    pub fn new(
        classes: Vec<Class>,
        lessons: Vec<Lesson>,
        progress: impl IntoIterator<Item = UserProgress>,
    ) -> Self {
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, class) in classes.iter().enumerate() {
            if let Some(parent) = &class.parent_class_id {
                children.entry(parent.clone()).or_default().push(idx);
            }
        }

        let mut lessons_by_class: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, lesson) in lessons.iter().enumerate() {
            lessons_by_class
                .entry(lesson.class_id.clone())
                .or_default()
                .push(idx);
        }

        let progress = progress
            .into_iter()
            .map(|p| (p.lesson_id.clone(), p))
            .collect();

        Self {
            classes,
            lessons,
            progress,
            children,
            lessons_by_class,
        }
    }

    /// Attach the top-level classes of `main`
    pub fn assemble_main(&self, main: MainTopic) -> MainWithClasses {
        let classes = self.top_level_classes(&main.id);
        MainWithClasses { main, classes }
    }

    /// Top-level classes (no parent) of a main topic, hydrated
    pub fn top_level_classes(&self, main_id: &str) -> Vec<ClassWithLessons> {
        let mut visited = HashSet::new();
        self.classes
            .iter()
            .filter(|c| c.main_id == main_id && c.is_top_level())
            .map(|c| self.assemble_class(c, &mut visited))
            .collect()
    }

    /// One class with its lessons and nested sub-classes
    pub fn class_tree(&self, class_id: &str) -> Option<ClassWithLessons> {
        let class = self.classes.iter().find(|c| c.id == class_id)?;
        Some(self.assemble_class(class, &mut HashSet::new()))
    }

    /// Lessons of one class merged with progress
    pub fn lessons_of(&self, class_id: &str) -> Vec<LessonWithProgress> {
        self.lessons_by_class
            .get(class_id)
            .into_iter()
            .flatten()
            .map(|&idx| {
                let lesson = &self.lessons[idx];
                LessonWithProgress::new(lesson.clone(), self.progress.get(&lesson.id).cloned())
            })
            .collect()
    }

    fn assemble_class(&self, class: &Class, visited: &mut HashSet<String>) -> ClassWithLessons {
        visited.insert(class.id.clone());

        let mut sub_classes = Vec::new();
        for &idx in self.children.get(&class.id).into_iter().flatten() {
            let child = &self.classes[idx];
            if child.main_id != class.main_id || visited.contains(&child.id) {
                continue;
            }
            sub_classes.push(self.assemble_class(child, visited));
        }

        ClassWithLessons {
            class: class.clone(),
            lessons: self.lessons_of(&class.id),
            sub_classes: (!sub_classes.is_empty()).then_some(sub_classes),
        }
    }
}

/// Merge a flat lesson list with progress keyed by lesson id
pub fn with_progress(
    lessons: Vec<Lesson>,
    progress: &HashMap<String, UserProgress>,
) -> Vec<LessonWithProgress> {
    lessons
        .into_iter()
        .map(|lesson| {
            let p = progress.get(&lesson.id).cloned();
            LessonWithProgress::new(lesson, p)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ProgressUpdate;
    use crate::model::timestamps;

    fn class(id: &str, main_id: &str, parent: Option<&str>) -> Class {
        Class {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            main_id: main_id.to_string(),
            parent_class_id: parent.map(str::to_string),
            order: 0,
            created_by: "u1".to_string(),
            created_at: timestamps::now(),
        }
    }

    fn lesson(id: &str, class_id: &str) -> Lesson {
        let now = timestamps::now();
        Lesson {
            id: id.to_string(),
            title: id.to_string(),
            content: "body".to_string(),
            excerpt: None,
            bible_reference: None,
            image_url: None,
            audio_url: None,
            duration: None,
            class_id: class_id.to_string(),
            order: 0,
            is_published: true,
            created_by: "u1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn main(id: &str) -> MainTopic {
        MainTopic {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            icon: None,
            order: 0,
            created_by: "u1".to_string(),
            created_at: timestamps::now(),
        }
    }

    #[test]
    fn test_top_level_only_and_sub_classes_nested() {
        let h = Hierarchy::new(
            vec![
                class("c1", "m1", None),
                class("c1a", "m1", Some("c1")),
                class("c1a-i", "m1", Some("c1a")),
                class("c2", "m1", None),
            ],
            vec![lesson("l1", "c1"), lesson("l2", "c1a-i")],
            vec![],
        );

        let tree = h.assemble_main(main("m1"));
        let top: Vec<&str> = tree.classes.iter().map(|c| c.class.id.as_str()).collect();
        assert_eq!(top, vec!["c1", "c2"]);

        let c1 = &tree.classes[0];
        assert_eq!(c1.lessons.len(), 1);
        let c1a = &c1.sub_classes.as_ref().unwrap()[0];
        assert_eq!(c1a.class.id, "c1a");
        assert!(c1a.lessons.is_empty());
        let c1a_i = &c1a.sub_classes.as_ref().unwrap()[0];
        assert_eq!(c1a_i.lessons[0].lesson.id, "l2");
        assert!(c1a_i.sub_classes.is_none());

        assert!(tree.classes[1].sub_classes.is_none());
    }

    #[test]
    fn test_sub_class_of_other_main_is_excluded() {
        let h = Hierarchy::new(
            vec![class("c1", "m1", None), class("stray", "m2", Some("c1"))],
            vec![],
            vec![],
        );
        let tree = h.assemble_main(main("m1"));
        assert!(tree.classes[0].sub_classes.is_none());
    }

    #[test]
    fn test_cycle_terminates() {
        let h = Hierarchy::new(
            vec![class("a", "m1", Some("b")), class("b", "m1", Some("a"))],
            vec![],
            vec![],
        );
        let a = h.class_tree("a").unwrap();
        let b = &a.sub_classes.as_ref().unwrap()[0];
        assert_eq!(b.class.id, "b");
        assert!(b.sub_classes.is_none());
    }

    #[test]
    fn test_progress_attached_by_lesson_id() {
        let progress = ProgressUpdate::new("u1", "l1")
            .bookmarked(true)
            .into_new_record("p1".to_string(), timestamps::now());
        let h = Hierarchy::new(
            vec![class("c1", "m1", None)],
            vec![lesson("l1", "c1"), lesson("l2", "c1")],
            vec![progress],
        );

        let lessons = h.lessons_of("c1");
        assert!(lessons[0].progress.as_ref().unwrap().bookmarked);
        assert!(lessons[1].progress.is_none());
    }

    #[test]
    fn test_lessons_of_unknown_class_are_dropped() {
        let h = Hierarchy::new(vec![], vec![lesson("l1", "gone")], vec![]);
        assert!(h.top_level_classes("m1").is_empty());
        assert!(h.class_tree("gone").is_none());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A grouping of lessons under a main topic
///
/// Classes nest through `parent_class_id`; a class without a parent is a
/// top-level class of its main topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub main_id: String,
    pub parent_class_id: Option<String>,
    /// Ascending sort key among siblings
    pub order: i32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Class {
    /// Check if this class sits directly under its main topic
    pub fn is_top_level(&self) -> bool {
        self.parent_class_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::timestamps;

    #[test]
    fn test_is_top_level() {
        let mut class = Class {
            id: "c1".to_string(),
            title: "Righteous People".to_string(),
            description: None,
            main_id: "m1".to_string(),
            parent_class_id: None,
            order: 0,
            created_by: "u1".to_string(),
            created_at: timestamps::now(),
        };
        assert!(class.is_top_level());

        class.parent_class_id = Some("c0".to_string());
        assert!(!class.is_top_level());
    }
}

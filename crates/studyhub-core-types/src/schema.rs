//! Canonical schema constants for structured logging
//!
//! Every log event emitted by the logging facility uses these keys so that
//! log pipelines and test captures can match on them.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Entity identifiers
pub const FIELD_USER_ID: &str = "user_id";
pub const FIELD_MAIN_ID: &str = "main_id";
pub const FIELD_CLASS_ID: &str = "class_id";
pub const FIELD_LESSON_ID: &str = "lesson_id";

// Collection sizes
pub const FIELD_RESULT_LEN: &str = "result_len";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_entity_fields_are_distinct() {
        let fields = [
            FIELD_USER_ID,
            FIELD_MAIN_ID,
            FIELD_CLASS_ID,
            FIELD_LESSON_ID,
        ];
        for (i, a) in fields.iter().enumerate() {
            for b in &fields[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

//! Field checks for post and comment bodies.

use crate::model::post::PostInput;
use serde::Serialize;
use std::collections::BTreeMap;

pub const TEXT_MIN_LEN: usize = 1;
pub const TEXT_MAX_LEN: usize = 300;

/// Field name to message, serialized as a flat JSON object.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Checks the fields of a post or comment body. Text length is measured
/// after trimming surrounding whitespace.
pub fn validate_post_input(input: &PostInput) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let text_len = input.text.trim().chars().count();

    if text_len < TEXT_MIN_LEN {
        errors.insert("text", "Text field is required");
    } else if text_len > TEXT_MAX_LEN {
        errors.insert(
            "text",
            format!("Post must be between {TEXT_MIN_LEN} and {TEXT_MAX_LEN} characters"),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::post::PostInput,
        validation::{TEXT_MAX_LEN, validate_post_input},
    };

    fn input(text: &str) -> PostInput {
        PostInput {
            text: text.to_owned(),
            name: "A".to_owned(),
            avatar: String::new(),
        }
    }

    #[test]
    fn accepts_short_text() {
        assert_eq!(validate_post_input(&input("hello")), Ok(()));
        assert_eq!(validate_post_input(&input(&"é".repeat(TEXT_MAX_LEN))), Ok(()));
    }

    #[test]
    fn surrounding_whitespace_does_not_count() {
        let padded = format!("  {}\n", "a".repeat(TEXT_MAX_LEN));

        assert_eq!(validate_post_input(&input(&padded)), Ok(()));
    }

    #[test]
    fn errors_are_std_errors() {
        let errors = validate_post_input(&input("")).unwrap_err();
        let error: Box<dyn std::error::Error> = Box::new(errors);

        assert_eq!(error.to_string(), "text: Text field is required");
        assert!(error.source().is_none());
    }

    #[test]
    fn requires_text() {
        for text in ["", "   \n"] {
            let errors = validate_post_input(&input(text)).unwrap_err();
            assert_eq!(errors.get("text"), Some("Text field is required"));
        }
    }

    #[test]
    fn rejects_long_text() {
        let errors = validate_post_input(&input(&"a".repeat(TEXT_MAX_LEN + 1))).unwrap_err();

        assert_eq!(
            errors.get("text"),
            Some("Post must be between 1 and 300 characters")
        );
        assert_eq!(
            serde_json::to_string(&errors).unwrap(),
            r#"{"text":"Post must be between 1 and 300 characters"}"#
        );
    }
}

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::{Validator, ApiError, Detail};
use crate::error::GeneralKind;
use crate::serde::nested_option;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub due: DateTime<Utc>,
    pub priority: Priority,
    pub completed: bool,
    pub user_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub due: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl Validator for CreateTask {
    fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            Err(ApiError::from((
                GeneralKind::ValidationFailed,
                Detail::with_key("title")
            )))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "nested_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl Validator for UpdateTask {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ApiError::from((
                    GeneralKind::ValidationFailed,
                    Detail::with_key("title")
                )));
            }
        }

        Ok(())
    }

    fn has_work(&self) -> bool {
        self.title.is_some() ||
            self.description.is_some() ||
            self.due.is_some() ||
            self.priority.is_some() ||
            self.completed.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ApiErrorKind;

    #[test]
    fn priority_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"HIGH\"");
        assert_eq!(serde_json::to_string(&Priority::Medium).unwrap(), "\"MEDIUM\"");
        assert_eq!(serde_json::to_string(&Priority::Low).unwrap(), "\"LOW\"");
    }

    #[test]
    fn update_with_no_fields_has_no_work() {
        let given: UpdateTask = serde_json::from_str("{}").unwrap();

        let err = given.assert_ok().unwrap_err();

        assert_eq!(*err.kind(), ApiErrorKind::General(GeneralKind::NoWork));
    }

    #[test]
    fn update_can_clear_description() {
        let given: UpdateTask = serde_json::from_str(r#"{"description":null}"#).unwrap();

        assert_eq!(given.description, Some(None));
        assert!(given.has_work());
    }

    #[test]
    fn create_requires_title() {
        let given = CreateTask {
            title: String::from("   "),
            description: None,
            due: Utc::now(),
            priority: None,
        };

        assert!(given.validate().is_err());
    }
}

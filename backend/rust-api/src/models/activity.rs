use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Quiz unit stored in the MongoDB "activities" collection.
///
/// The type-specific payload lives in `is_true` (True/False) and `options`
/// (Multiple options). Text activities carry neither and are never
/// auto-corrected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub question: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(rename = "isTrue", default)]
    pub is_true: Option<bool>,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    pub created_by: String,
    /// Epoch milliseconds kept as a string for wire compatibility.
    pub created_at: String,
    #[serde(default)]
    pub viewed_by: Vec<String>,
}

impl Activity {
    /// Grades a submitted answer against this activity.
    ///
    /// True/False compares against the lowercase string form of `is_true`.
    /// Multiple options compares against the text of the option flagged
    /// correct. Text activities and records missing their type payload
    /// always grade as incorrect.
    pub fn check_answer(&self, answer: &str) -> bool {
        match self.activity_type {
            ActivityType::TrueFalse => self
                .is_true
                .map_or(false, |expected| answer == expected.to_string()),
            ActivityType::MultipleOptions => self
                .options
                .iter()
                .find(|option| option.correct)
                .map_or(false, |option| answer == option.text),
            ActivityType::Text => false,
        }
    }

    /// Whether `user_id` already appears in this activity's view log.
    pub fn is_viewed_by(&self, user_id: &str) -> bool {
        self.viewed_by.iter().any(|viewer| viewer == user_id)
    }
}

/// Supported quiz formats. The wire names are fixed by the existing clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    #[serde(rename = "True/False")]
    TrueFalse,
    #[serde(rename = "Multiple options")]
    MultipleOptions,
    #[serde(rename = "Text")]
    Text,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::TrueFalse => "True/False",
            ActivityType::MultipleOptions => "Multiple options",
            ActivityType::Text => "Text",
        }
    }
}

/// One selectable answer of a "Multiple options" activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

/// Request DTO for creating an activity (admin only)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateActivityRequest {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Question must be between 1 and 500 characters"
    ))]
    pub question: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(rename = "isTrue", default)]
    pub is_true: Option<bool>,
    #[serde(default)]
    pub options: Option<Vec<AnswerOption>>,
}

impl CreateActivityRequest {
    /// A gradable "Multiple options" payload must flag exactly one option
    /// as correct.
    pub fn ensure_single_correct_option(&self) -> Result<(), String> {
        if self.activity_type == ActivityType::MultipleOptions {
            if let Some(options) = &self.options {
                return check_single_correct(options);
            }
        }
        Ok(())
    }
}

/// Partial update DTO; creator and audit fields are not client-writable
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateActivityRequest {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Question must be between 1 and 500 characters"
    ))]
    pub question: Option<String>,
    #[serde(rename = "type", default)]
    pub activity_type: Option<ActivityType>,
    #[serde(rename = "isTrue", default)]
    pub is_true: Option<bool>,
    #[serde(default)]
    pub options: Option<Vec<AnswerOption>>,
}

impl UpdateActivityRequest {
    pub fn ensure_single_correct_option(&self) -> Result<(), String> {
        match &self.options {
            Some(options) => check_single_correct(options),
            None => Ok(()),
        }
    }
}

fn check_single_correct(options: &[AnswerOption]) -> Result<(), String> {
    let correct_count = options.iter().filter(|option| option.correct).count();
    if correct_count == 1 {
        Ok(())
    } else {
        Err("Multiple-options activities must flag exactly one correct option".to_string())
    }
}

/// Request body for answer grading.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckAnswerRequest {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct CheckAnswerResponse {
    pub correct: bool,
}

/// Activity as returned to clients (string id instead of BSON ObjectId).
#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(rename = "isTrue")]
    pub is_true: Option<bool>,
    pub options: Vec<AnswerOption>,
    pub created_by: String,
    pub created_at: String,
    pub viewed_by: Vec<String>,
}

impl From<Activity> for ActivityResponse {
    fn from(activity: Activity) -> Self {
        Self {
            id: activity.id.map(|id| id.to_hex()).unwrap_or_default(),
            question: activity.question,
            activity_type: activity.activity_type,
            is_true: activity.is_true,
            options: activity.options,
            created_by: activity.created_by,
            created_at: activity.created_at,
            viewed_by: activity.viewed_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn activity(activity_type: ActivityType) -> Activity {
        Activity {
            id: None,
            question: "¿2 + 2 = 4?".to_string(),
            activity_type,
            is_true: None,
            options: Vec::new(),
            created_by: "auth0|teacher".to_string(),
            created_at: "1714556400000".to_string(),
            viewed_by: Vec::new(),
        }
    }

    fn option(text: &str, correct: bool) -> AnswerOption {
        AnswerOption {
            text: text.to_string(),
            correct,
        }
    }

    #[test]
    fn true_false_matches_lowercase_string_form() {
        let mut quiz = activity(ActivityType::TrueFalse);
        quiz.is_true = Some(true);

        assert!(quiz.check_answer("true"));
        assert!(!quiz.check_answer("false"));
        assert!(!quiz.check_answer("True"));
        assert!(!quiz.check_answer(""));
    }

    #[test]
    fn true_false_with_false_answer() {
        let mut quiz = activity(ActivityType::TrueFalse);
        quiz.is_true = Some(false);

        assert!(quiz.check_answer("false"));
        assert!(!quiz.check_answer("true"));
    }

    #[test]
    fn true_false_without_payload_never_matches() {
        let quiz = activity(ActivityType::TrueFalse);

        assert!(!quiz.check_answer("true"));
        assert!(!quiz.check_answer("false"));
    }

    #[test]
    fn multiple_options_matches_the_correct_text() {
        let mut quiz = activity(ActivityType::MultipleOptions);
        quiz.options = vec![option("A", false), option("B", true)];

        assert!(quiz.check_answer("B"));
        assert!(!quiz.check_answer("A"));
        assert!(!quiz.check_answer("b"));
    }

    #[test]
    fn multiple_options_without_correct_flag_never_matches() {
        let mut quiz = activity(ActivityType::MultipleOptions);
        quiz.options = vec![option("A", false), option("B", false)];

        assert!(!quiz.check_answer("A"));
        assert!(!quiz.check_answer("B"));
    }

    #[test]
    fn text_activities_are_never_auto_corrected() {
        let quiz = activity(ActivityType::Text);

        assert!(!quiz.check_answer("anything"));
        assert!(!quiz.check_answer(""));
    }

    #[test]
    fn view_log_membership_is_an_exact_match() {
        let mut quiz = activity(ActivityType::Text);
        quiz.viewed_by = vec!["auth0|alice".to_string()];

        assert!(quiz.is_viewed_by("auth0|alice"));
        assert!(!quiz.is_viewed_by("auth0|bob"));
        assert!(!quiz.is_viewed_by("auth0|ALICE"));
        assert!(!quiz.is_viewed_by(""));
    }

    #[test]
    fn activity_type_uses_legacy_wire_names() {
        assert_eq!(
            serde_json::to_value(ActivityType::TrueFalse).unwrap(),
            json!("True/False")
        );
        assert_eq!(
            serde_json::to_value(ActivityType::MultipleOptions).unwrap(),
            json!("Multiple options")
        );
        assert_eq!(
            serde_json::to_value(ActivityType::Text).unwrap(),
            json!("Text")
        );
    }

    #[test]
    fn activity_serializes_with_wire_field_names() {
        let mut quiz = activity(ActivityType::TrueFalse);
        quiz.is_true = Some(true);

        let value = serde_json::to_value(&quiz).unwrap();
        assert_eq!(value["type"], json!("True/False"));
        assert_eq!(value["isTrue"], json!(true));
        assert_eq!(value["created_at"], json!("1714556400000"));
        assert!(value.get("_id").is_none());
    }

    #[test]
    fn create_request_requires_exactly_one_correct_option() {
        let parse = |options: serde_json::Value| -> CreateActivityRequest {
            serde_json::from_value(json!({
                "question": "Pick one",
                "type": "Multiple options",
                "options": options,
            }))
            .unwrap()
        };

        let none_correct = parse(json!([{"text": "A"}, {"text": "B"}]));
        assert!(none_correct.ensure_single_correct_option().is_err());

        let two_correct = parse(json!([
            {"text": "A", "correct": true},
            {"text": "B", "correct": true}
        ]));
        assert!(two_correct.ensure_single_correct_option().is_err());

        let one_correct = parse(json!([
            {"text": "A", "correct": true},
            {"text": "B", "correct": false}
        ]));
        assert!(one_correct.ensure_single_correct_option().is_ok());
    }

    #[test]
    fn create_request_skips_option_check_for_other_types() {
        let request: CreateActivityRequest = serde_json::from_value(json!({
            "question": "¿Verdadero?",
            "type": "True/False",
            "isTrue": true,
        }))
        .unwrap();

        assert!(request.ensure_single_correct_option().is_ok());
    }

    #[test]
    fn update_request_checks_options_only_when_provided() {
        let without_options: UpdateActivityRequest =
            serde_json::from_value(json!({ "question": "Edited" })).unwrap();
        assert!(without_options.ensure_single_correct_option().is_ok());

        let with_bad_options: UpdateActivityRequest = serde_json::from_value(json!({
            "options": [{"text": "A"}, {"text": "B"}]
        }))
        .unwrap();
        assert!(with_bad_options.ensure_single_correct_option().is_err());
    }
}

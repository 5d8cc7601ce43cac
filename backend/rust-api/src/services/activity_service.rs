use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson};
use mongodb::options::ReturnDocument;
use mongodb::Database;

use crate::models::activity::{
    Activity, ActivityType, AnswerOption, CreateActivityRequest, UpdateActivityRequest,
};

/// Store access for quiz activities.
pub struct ActivityService {
    mongo: Database,
}

impl ActivityService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Creates an activity stamped with the creating user and time.
    ///
    /// The type-specific payload is normalized first: a True/False activity
    /// keeps `isTrue` only when provided, a Multiple-options activity keeps
    /// `options` only when provided, and any mismatched payload is cleared.
    pub async fn create_activity(
        &self,
        request: CreateActivityRequest,
        created_by: &str,
    ) -> Result<Activity> {
        let collection = self.mongo.collection::<Activity>("activities");

        let activity = build_new_activity(request, created_by);

        let insert_result = collection
            .insert_one(&activity)
            .await
            .context("Failed to insert activity")?;
        let activity_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow!("Failed to get inserted activity ID"))?;

        let created = collection
            .find_one(doc! { "_id": activity_id })
            .await
            .context("Failed to fetch created activity")?
            .ok_or_else(|| anyhow!("Activity not found after creation"))?;
        Ok(created)
    }

    pub async fn get_all_activities(&self) -> Result<Vec<Activity>> {
        let collection = self.mongo.collection::<Activity>("activities");

        let cursor = collection
            .find(doc! {})
            .await
            .context("Failed to query activities")?;
        let activities: Vec<Activity> = cursor
            .try_collect()
            .await
            .context("Failed to collect activities")?;
        Ok(activities)
    }

    pub async fn get_activity_by_id(&self, id: &str) -> Result<Option<Activity>> {
        let Some(object_id) = parse_object_id(id) else {
            return Ok(None);
        };
        let collection = self.mongo.collection::<Activity>("activities");

        collection
            .find_one(doc! { "_id": object_id })
            .await
            .context("Failed to query activity")
    }

    /// Merge-updates the client-writable fields and returns the new record.
    /// Creator, creation time and view history are never touched.
    pub async fn update_activity(
        &self,
        id: &str,
        request: UpdateActivityRequest,
    ) -> Result<Option<Activity>> {
        let Some(object_id) = parse_object_id(id) else {
            return Ok(None);
        };
        let collection = self.mongo.collection::<Activity>("activities");

        let mut set_fields = doc! {};
        if let Some(question) = request.question {
            set_fields.insert("question", question);
        }
        if let Some(activity_type) = request.activity_type {
            set_fields.insert("type", activity_type.as_str());
        }
        if let Some(is_true) = request.is_true {
            set_fields.insert("isTrue", is_true);
        }
        if let Some(options) = request.options {
            set_fields.insert(
                "options",
                to_bson(&options).context("Failed to serialize options")?,
            );
        }

        if set_fields.is_empty() {
            // Nothing writable was provided; answer with the current record.
            return collection
                .find_one(doc! { "_id": object_id })
                .await
                .context("Failed to query activity");
        }

        collection
            .find_one_and_update(doc! { "_id": object_id }, doc! { "$set": set_fields })
            .return_document(ReturnDocument::After)
            .await
            .context("Failed to update activity")
    }

    pub async fn delete_activity(&self, id: &str) -> Result<Option<Activity>> {
        let Some(object_id) = parse_object_id(id) else {
            return Ok(None);
        };
        let collection = self.mongo.collection::<Activity>("activities");

        collection
            .find_one_and_delete(doc! { "_id": object_id })
            .await
            .context("Failed to delete activity")
    }

    /// Records that a user viewed the activity. Idempotent: a user id is
    /// stored at most once and an already-recorded view writes nothing.
    pub async fn mark_activity_as_viewed(&self, id: &str, user_id: &str) -> Result<()> {
        let Some(object_id) = parse_object_id(id) else {
            return Err(anyhow!("Actividad no encontrada"));
        };
        let collection = self.mongo.collection::<Activity>("activities");

        let activity = collection
            .find_one(doc! { "_id": object_id })
            .await
            .context("Failed to query activity")?
            .ok_or_else(|| anyhow!("Actividad no encontrada"))?;

        if activity.is_viewed_by(user_id) {
            return Ok(());
        }

        collection
            .update_one(
                doc! { "_id": object_id },
                doc! { "$addToSet": { "viewed_by": user_id } },
            )
            .await
            .context("Failed to record activity view")?;
        Ok(())
    }

    pub async fn get_viewed_activities_by_user(&self, user_id: &str) -> Result<Vec<Activity>> {
        let collection = self.mongo.collection::<Activity>("activities");

        let cursor = collection
            .find(doc! { "viewed_by": user_id })
            .await
            .context("Failed to query viewed activities")?;
        let activities: Vec<Activity> = cursor
            .try_collect()
            .await
            .context("Failed to collect viewed activities")?;
        Ok(activities)
    }
}

// An id that does not parse can never match a stored document.
fn parse_object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

/// Builds the record stored for a freshly created activity: normalized type
/// payload, the creating user, an epoch-milliseconds stamp and an empty view
/// log.
fn build_new_activity(request: CreateActivityRequest, created_by: &str) -> Activity {
    let (is_true, options) = normalize_type_payload(&request);
    Activity {
        id: None,
        question: request.question,
        activity_type: request.activity_type,
        is_true,
        options,
        created_by: created_by.to_string(),
        created_at: Utc::now().timestamp_millis().to_string(),
        viewed_by: Vec::new(),
    }
}

/// Keeps the type-specific payload only when it matches the declared type.
/// A mismatched or missing payload is silently cleared, which existing
/// clients rely on.
fn normalize_type_payload(request: &CreateActivityRequest) -> (Option<bool>, Vec<AnswerOption>) {
    match request.activity_type {
        ActivityType::TrueFalse if request.is_true.is_some() => (request.is_true, Vec::new()),
        ActivityType::MultipleOptions => match &request.options {
            Some(options) => (None, options.clone()),
            None => (None, Vec::new()),
        },
        _ => (None, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(
        activity_type: ActivityType,
        is_true: Option<bool>,
        options: Option<Vec<AnswerOption>>,
    ) -> CreateActivityRequest {
        CreateActivityRequest {
            question: "¿Pregunta?".to_string(),
            activity_type,
            is_true,
            options,
        }
    }

    fn options() -> Vec<AnswerOption> {
        vec![
            AnswerOption {
                text: "A".to_string(),
                correct: true,
            },
            AnswerOption {
                text: "B".to_string(),
                correct: false,
            },
        ]
    }

    #[test]
    fn true_false_keeps_its_payload() {
        let (is_true, options) =
            normalize_type_payload(&request(ActivityType::TrueFalse, Some(true), None));
        assert_eq!(is_true, Some(true));
        assert!(options.is_empty());
    }

    #[test]
    fn true_false_without_payload_falls_back_silently() {
        let (is_true, options) =
            normalize_type_payload(&request(ActivityType::TrueFalse, None, Some(options())));
        assert_eq!(is_true, None);
        assert!(options.is_empty());
    }

    #[test]
    fn multiple_options_keeps_its_payload() {
        let (is_true, kept) = normalize_type_payload(&request(
            ActivityType::MultipleOptions,
            Some(true),
            Some(options()),
        ));
        assert_eq!(is_true, None);
        assert_eq!(kept, options());
    }

    #[test]
    fn multiple_options_without_payload_falls_back_silently() {
        let (is_true, kept) =
            normalize_type_payload(&request(ActivityType::MultipleOptions, Some(true), None));
        assert_eq!(is_true, None);
        assert!(kept.is_empty());
    }

    #[test]
    fn text_drops_any_stray_payload() {
        let (is_true, kept) =
            normalize_type_payload(&request(ActivityType::Text, Some(false), Some(options())));
        assert_eq!(is_true, None);
        assert!(kept.is_empty());
    }

    #[test]
    fn malformed_ids_never_parse() {
        assert!(parse_object_id("not-an-object-id").is_none());
        assert!(parse_object_id("").is_none());
        assert!(parse_object_id("64fa1b2c9d8e7f6a5b4c3d2e").is_some());
    }

    #[test]
    fn new_activities_are_stamped_with_creator_and_empty_view_log() {
        let activity = build_new_activity(
            request(ActivityType::TrueFalse, Some(true), None),
            "auth0|prof",
        );

        assert!(activity.id.is_none());
        assert_eq!(activity.created_by, "auth0|prof");
        assert!(activity.viewed_by.is_empty());

        // Epoch milliseconds, not seconds.
        let stamp: i64 = activity.created_at.parse().unwrap();
        assert!(stamp > 1_000_000_000_000);
    }

    #[test]
    fn new_activities_carry_the_normalized_payload() {
        let activity = build_new_activity(
            request(ActivityType::TrueFalse, None, Some(options())),
            "auth0|prof",
        );

        assert_eq!(activity.is_true, None);
        assert!(activity.options.is_empty());
    }
}

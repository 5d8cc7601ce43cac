use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::Database;

use crate::models::course::{Course, CreateCourseRequest, UpdateCourseRequest};

/// Store access for courses.
pub struct CourseService {
    mongo: Database,
}

impl CourseService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Creates a course stamped with the creating user and time.
    pub async fn create_course(
        &self,
        request: CreateCourseRequest,
        created_by: &str,
    ) -> Result<Course> {
        let collection = self.mongo.collection::<Course>("courses");

        let course = Course {
            id: None,
            name: request.name,
            description: request.description,
            created_by: created_by.to_string(),
            created_at: Utc::now().timestamp_millis().to_string(),
        };

        let insert_result = collection
            .insert_one(&course)
            .await
            .context("Failed to insert course")?;
        let course_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow!("Failed to get inserted course ID"))?;

        let created = collection
            .find_one(doc! { "_id": course_id })
            .await
            .context("Failed to fetch created course")?
            .ok_or_else(|| anyhow!("Course not found after creation"))?;
        Ok(created)
    }

    pub async fn get_all_courses(&self) -> Result<Vec<Course>> {
        let collection = self.mongo.collection::<Course>("courses");

        let cursor = collection
            .find(doc! {})
            .await
            .context("Failed to query courses")?;
        let courses: Vec<Course> = cursor
            .try_collect()
            .await
            .context("Failed to collect courses")?;
        Ok(courses)
    }

    pub async fn get_course_by_id(&self, id: &str) -> Result<Option<Course>> {
        let Some(object_id) = parse_object_id(id) else {
            return Ok(None);
        };
        let collection = self.mongo.collection::<Course>("courses");

        collection
            .find_one(doc! { "_id": object_id })
            .await
            .context("Failed to query course")
    }

    /// Merge-updates name and description; creator and creation time are
    /// never touched.
    pub async fn update_course_by_id(
        &self,
        id: &str,
        request: UpdateCourseRequest,
    ) -> Result<Option<Course>> {
        let Some(object_id) = parse_object_id(id) else {
            return Ok(None);
        };
        let collection = self.mongo.collection::<Course>("courses");

        let mut set_fields = doc! {};
        if let Some(name) = request.name {
            set_fields.insert("name", name);
        }
        if let Some(description) = request.description {
            set_fields.insert("description", description);
        }

        if set_fields.is_empty() {
            return collection
                .find_one(doc! { "_id": object_id })
                .await
                .context("Failed to query course");
        }

        collection
            .find_one_and_update(doc! { "_id": object_id }, doc! { "$set": set_fields })
            .return_document(ReturnDocument::After)
            .await
            .context("Failed to update course")
    }

    pub async fn delete_course_by_id(&self, id: &str) -> Result<Option<Course>> {
        let Some(object_id) = parse_object_id(id) else {
            return Ok(None);
        };
        let collection = self.mongo.collection::<Course>("courses");

        collection
            .find_one_and_delete(doc! { "_id": object_id })
            .await
            .context("Failed to delete course")
    }
}

fn parse_object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use storage::repository::{StorageError, StudentRepository};
use tactile_core::model::{Student, StudentId, StudentPatch, StudentProfile};
use tracing::info;

use crate::Clock;
use crate::error::StudentServiceError;

/// Serializable projection of a student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentView {
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub medical_notes: Option<String>,
    pub learning_goals: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Student> for StudentView {
    fn from(student: &Student) -> Self {
        let p = student.profile();
        Self {
            student_id: student.id().clone(),
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            date_of_birth: p.date_of_birth,
            email: p.email.clone(),
            phone: p.phone.clone(),
            emergency_contact: p.emergency_contact.clone(),
            emergency_phone: p.emergency_phone.clone(),
            medical_notes: p.medical_notes.clone(),
            learning_goals: p.learning_goals.clone(),
            created_at: student.created_at(),
            updated_at: student.updated_at(),
        }
    }
}

/// Registration, partial update and removal of students.
#[derive(Clone)]
pub struct StudentService {
    clock: Clock,
    students: Arc<dyn StudentRepository>,
}

impl StudentService {
    #[must_use]
    pub fn new(clock: Clock, students: Arc<dyn StudentRepository>) -> Self {
        Self { clock, students }
    }

    /// Register a new student.
    ///
    /// # Errors
    ///
    /// Returns `StudentServiceError::Invalid` for a malformed id or profile,
    /// `StudentServiceError::AlreadyExists` if the id is taken.
    pub async fn register(
        &self,
        raw_id: &str,
        profile: StudentProfile,
    ) -> Result<Student, StudentServiceError> {
        let id = StudentId::parse(raw_id)?;
        let student = Student::new(id.clone(), profile, self.clock.now())?;
        match self.students.insert_student(&student).await {
            Ok(()) => {}
            Err(StorageError::Conflict) => return Err(StudentServiceError::AlreadyExists(id)),
            Err(e) => return Err(e.into()),
        }
        info!(student_id = %id, "student registered");
        Ok(student)
    }

    /// # Errors
    ///
    /// Returns `StudentServiceError::NotFound` if the student does not exist.
    pub async fn get(&self, raw_id: &str) -> Result<Student, StudentServiceError> {
        let id = StudentId::parse(raw_id)?;
        self.students
            .get_student(&id)
            .await?
            .ok_or(StudentServiceError::NotFound(id))
    }

    /// Overwrite only the supplied fields.
    ///
    /// # Errors
    ///
    /// Returns `StudentServiceError::Invalid` if a supplied field is invalid,
    /// `StudentServiceError::NotFound` if the student does not exist.
    pub async fn update(
        &self,
        raw_id: &str,
        patch: StudentPatch,
    ) -> Result<Student, StudentServiceError> {
        let id = StudentId::parse(raw_id)?;
        let patch = patch.validate()?;
        match self
            .students
            .update_student(&id, &patch, self.clock.now())
            .await
        {
            Ok(student) => {
                info!(student_id = %id, "student updated");
                Ok(student)
            }
            Err(StorageError::NotFound) => Err(StudentServiceError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a student and everything recorded for them.
    ///
    /// # Errors
    ///
    /// Returns `StudentServiceError::NotFound` if the student does not exist.
    pub async fn delete(&self, raw_id: &str) -> Result<(), StudentServiceError> {
        let id = StudentId::parse(raw_id)?;
        match self.students.delete_student(&id).await {
            Ok(()) => {
                info!(student_id = %id, "student deleted");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(StudentServiceError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use tactile_core::time::fixed_clock;

    fn service() -> StudentService {
        StudentService::new(fixed_clock(), Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn register_rejects_duplicates() {
        let svc = service();
        svc.register("STU9", StudentProfile::new("Ana", "Lee"))
            .await
            .unwrap();
        let err = svc
            .register("STU9", StudentProfile::new("Ben", "Ode"))
            .await
            .unwrap_err();
        assert!(matches!(err, StudentServiceError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let svc = service();
        let err = svc
            .register("", StudentProfile::new("Ana", "Lee"))
            .await
            .unwrap_err();
        assert!(matches!(err, StudentServiceError::Invalid(_)));
        let err = svc
            .register("STU1", StudentProfile::new("Ana", " "))
            .await
            .unwrap_err();
        assert!(matches!(err, StudentServiceError::Invalid(_)));
    }

    #[tokio::test]
    async fn update_keeps_unsupplied_fields() {
        let svc = service();
        let mut profile = StudentProfile::new("Ana", "Lee");
        profile.learning_goals = Some("Recognise corners".into());
        svc.register("STU9", profile).await.unwrap();

        let updated = svc
            .update(
                "STU9",
                StudentPatch {
                    email: Some("x@y.com".into()),
                    ..StudentPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.profile().email.as_deref(), Some("x@y.com"));
        assert_eq!(updated.first_name(), "Ana");
        assert_eq!(
            updated.profile().learning_goals.as_deref(),
            Some("Recognise corners")
        );
    }

    #[tokio::test]
    async fn missing_student_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.get("STU404").await,
            Err(StudentServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete("STU404").await,
            Err(StudentServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.update("STU404", StudentPatch::default()).await,
            Err(StudentServiceError::NotFound(_))
        ));
    }
}

use std::sync::Arc;

use storage::repository::{SchemaRepository, SchemaStatus, Storage};
use storage::sqlite::StoreOptions;

use crate::Clock;
use crate::assessment::AssessmentService;
use crate::error::AppServicesError;
use crate::learning_service::LearningService;
use crate::progress::ProgressService;
use crate::student_service::StudentService;

/// Assembles the services the HTTP layer shares between handlers.
#[derive(Clone)]
pub struct AppServices {
    students: Arc<StudentService>,
    learning: Arc<LearningService>,
    assessments: Arc<AssessmentService>,
    progress: Arc<ProgressService>,
    schema: Arc<dyn SchemaRepository>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the store cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        options: StoreOptions,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url, options).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let students = Arc::new(StudentService::new(clock, Arc::clone(&storage.students)));
        let learning = Arc::new(LearningService::new(
            clock,
            Arc::clone(&storage.learning_sessions),
        ));
        let assessments = Arc::new(AssessmentService::new(
            clock,
            Arc::clone(&storage.students),
            Arc::clone(&storage.learning_sessions),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.assessments),
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.students),
            Arc::clone(&storage.learning_sessions),
            Arc::clone(&storage.questions),
        ));

        Self {
            students,
            learning,
            assessments,
            progress,
            schema: Arc::clone(&storage.schema),
        }
    }

    #[must_use]
    pub fn students(&self) -> Arc<StudentService> {
        Arc::clone(&self.students)
    }

    #[must_use]
    pub fn learning(&self) -> Arc<LearningService> {
        Arc::clone(&self.learning)
    }

    #[must_use]
    pub fn assessments(&self) -> Arc<AssessmentService> {
        Arc::clone(&self.assessments)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    /// Which tables exist right now.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if the store cannot be queried.
    pub async fn schema_status(&self) -> Result<SchemaStatus, AppServicesError> {
        Ok(self.schema.schema_status().await?)
    }

    /// Create missing tables and report the resulting status.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if the schema cannot be created.
    pub async fn ensure_schema(&self) -> Result<SchemaStatus, AppServicesError> {
        self.schema.ensure_schema().await?;
        self.schema_status().await
    }
}

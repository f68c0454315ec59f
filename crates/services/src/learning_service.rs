use std::sync::Arc;

use storage::repository::{LearningSessionRepository, StorageError};
use tactile_core::model::{LearningSession, NewLearningSession, Shape, StudentId};
use tracing::info;

use crate::Clock;
use crate::error::LearningServiceError;

/// Records explanations given on the tactile board.
#[derive(Clone)]
pub struct LearningService {
    clock: Clock,
    sessions: Arc<dyn LearningSessionRepository>,
}

impl LearningService {
    #[must_use]
    pub fn new(clock: Clock, sessions: Arc<dyn LearningSessionRepository>) -> Self {
        Self { clock, sessions }
    }

    /// Append a learning session stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for a malformed id, unknown shape or blank
    /// explanation, `LearningServiceError::StudentNotFound` for an unknown
    /// student.
    pub async fn record(
        &self,
        raw_id: &str,
        shape: &str,
        explanation: &str,
    ) -> Result<LearningSession, LearningServiceError> {
        let id = StudentId::parse(raw_id)?;
        let shape: Shape = shape.parse()?;
        let draft = NewLearningSession::new(id.clone(), shape, explanation, self.clock.now())?;
        let session = match self.sessions.append_session(&draft).await {
            Ok(session) => session,
            Err(StorageError::NotFound) => return Err(LearningServiceError::StudentNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        info!(
            student_id = %id,
            session_id = %session.id,
            shape = %shape,
            "learning session recorded"
        );
        Ok(session)
    }
}

mod assessment;
mod ids;
mod learning;
mod shape;
mod student;

pub use assessment::{
    AssessmentQuestion, AssessmentQuestionError, AssessmentSession, AssessmentStatus,
    CORRECT_ASSESSMENT, NewAssessmentQuestion, is_correct,
};
pub use ids::{AssessmentSessionId, LearningSessionId, QuestionId, STUDENT_ID_MAX_LEN, StudentId};
pub use learning::{LearningSession, LearningSessionError, NewLearningSession};
pub use shape::{Shape, ShapeError};
pub use student::{NAME_MAX_LEN, Student, StudentError, StudentPatch, StudentProfile};

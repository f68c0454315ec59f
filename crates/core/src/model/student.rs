use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::ids::StudentId;

/// Maximum length of a first or last name.
pub const NAME_MAX_LEN: usize = 100;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudentError {
    #[error("student id cannot be empty")]
    EmptyId,

    #[error("student id is too long ({len} characters, max 20)")]
    IdTooLong { len: usize },

    #[error("student id contains invalid character {0:?}")]
    InvalidIdChar(char),

    #[error("{field} cannot be empty")]
    EmptyName { field: &'static str },

    #[error("{field} is too long ({len} characters, max 100)")]
    NameTooLong { field: &'static str, len: usize },

    #[error("email address is not valid: {0}")]
    InvalidEmail(String),
}

//
// ─── PROFILE ───────────────────────────────────────────────────────────────────
//

/// Descriptive fields of a student record.
///
/// Optional free-text fields are normalized so that blank strings are stored
/// as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentProfile {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub medical_notes: Option<String>,
    pub learning_goals: Option<String>,
}

impl StudentProfile {
    #[must_use]
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }

    fn normalized(self) -> Result<Self, StudentError> {
        Ok(Self {
            first_name: validate_name("first name", &self.first_name)?,
            last_name: validate_name("last name", &self.last_name)?,
            date_of_birth: self.date_of_birth,
            email: normalize_email(self.email)?,
            phone: non_blank(self.phone),
            emergency_contact: non_blank(self.emergency_contact),
            emergency_phone: non_blank(self.emergency_phone),
            medical_notes: non_blank(self.medical_notes),
            learning_goals: non_blank(self.learning_goals),
        })
    }
}

fn validate_name(field: &'static str, raw: &str) -> Result<String, StudentError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StudentError::EmptyName { field });
    }
    let len = trimmed.chars().count();
    if len > NAME_MAX_LEN {
        return Err(StudentError::NameTooLong { field, len });
    }
    Ok(trimmed.to_owned())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn normalize_email(value: Option<String>) -> Result<Option<String>, StudentError> {
    match non_blank(value) {
        Some(email) if !email.contains('@') || email.contains(char::is_whitespace) => {
            Err(StudentError::InvalidEmail(email))
        }
        other => Ok(other),
    }
}

//
// ─── STUDENT ───────────────────────────────────────────────────────────────────
//

/// A registered learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    id: StudentId,
    profile: StudentProfile,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Student {
    /// Register a new student.
    ///
    /// # Errors
    ///
    /// Returns `StudentError` if the names or email fail validation.
    pub fn new(
        id: StudentId,
        profile: StudentProfile,
        created_at: DateTime<Utc>,
    ) -> Result<Self, StudentError> {
        Ok(Self {
            id,
            profile: profile.normalized()?,
            created_at,
            updated_at: created_at,
        })
    }

    /// Rehydrate a student from persisted storage without re-validating.
    #[must_use]
    pub fn from_persisted(
        id: StudentId,
        profile: StudentProfile,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            profile,
            created_at,
            updated_at,
        }
    }

    /// Apply a partial update: only fields present in the patch overwrite.
    pub fn apply_patch(&mut self, patch: &StudentPatch, updated_at: DateTime<Utc>) {
        let p = &mut self.profile;
        if let Some(v) = &patch.first_name {
            p.first_name.clone_from(v);
        }
        if let Some(v) = &patch.last_name {
            p.last_name.clone_from(v);
        }
        if let Some(v) = patch.date_of_birth {
            p.date_of_birth = Some(v);
        }
        for (slot, value) in [
            (&mut p.email, &patch.email),
            (&mut p.phone, &patch.phone),
            (&mut p.emergency_contact, &patch.emergency_contact),
            (&mut p.emergency_phone, &patch.emergency_phone),
            (&mut p.medical_notes, &patch.medical_notes),
            (&mut p.learning_goals, &patch.learning_goals),
        ] {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }
        self.updated_at = updated_at;
    }

    #[must_use]
    pub fn id(&self) -> &StudentId {
        &self.id
    }

    #[must_use]
    pub fn profile(&self) -> &StudentProfile {
        &self.profile
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.profile.first_name
    }

    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.profile.last_name
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.profile.first_name, self.profile.last_name)
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

//
// ─── PATCH ─────────────────────────────────────────────────────────────────────
//

/// Partial update of a student profile.
///
/// `None` means "keep the stored value". Blank strings are treated the same
/// as `None`, so a patch can never erase a field by accident.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub medical_notes: Option<String>,
    pub learning_goals: Option<String>,
}

impl StudentPatch {
    /// Normalize the patch and validate every supplied field.
    ///
    /// # Errors
    ///
    /// Returns `StudentError` if a supplied name or email is invalid.
    pub fn validate(self) -> Result<Self, StudentError> {
        let first_name = non_blank(self.first_name)
            .map(|v| validate_name("first name", &v))
            .transpose()?;
        let last_name = non_blank(self.last_name)
            .map(|v| validate_name("last name", &v))
            .transpose()?;
        Ok(Self {
            first_name,
            last_name,
            date_of_birth: self.date_of_birth,
            email: normalize_email(self.email)?,
            phone: non_blank(self.phone),
            emergency_contact: non_blank(self.emergency_contact),
            emergency_phone: non_blank(self.emergency_phone),
            medical_notes: non_blank(self.medical_notes),
            learning_goals: non_blank(self.learning_goals),
        })
    }

    /// True when the patch would not change anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

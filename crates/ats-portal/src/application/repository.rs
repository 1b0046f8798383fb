use serde::{Deserialize, Serialize};

use super::domain::{ApplicationDraft, ApplicationId, ApplicationStatus, JobId, UserId};

/// Repository record for an application in progress or already submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application_id: ApplicationId,
    pub job: JobId,
    pub applicant: UserId,
    pub status: ApplicationStatus,
    pub draft: ApplicationDraft,
}

impl ApplicationRecord {
    pub fn job_reference(&self) -> &JobId {
        &self.job
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.application_id.clone(),
            job: self.job.clone(),
            status: self.status.label(),
            language_skills: self.draft.language_skills.len(),
            files: self.draft.files.len(),
        }
    }
}

/// Storage abstraction so the controller can be exercised with fakes.
pub trait ApplicationRepository: Send + Sync {
    fn find_by_identifier(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;

    /// Application the user started for a job but has not submitted yet.
    fn find_in_progress(
        &self,
        job: &JobId,
        applicant: &UserId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;

    fn save(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record belongs to another applicant")]
    Conflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Public representation of a stored application.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub job: JobId,
    pub status: &'static str,
    pub language_skills: usize,
    pub files: usize,
}

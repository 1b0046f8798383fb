use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of the job posting an application belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for stored applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Frontend user handle as issued by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Frontend user group that may be required for access to the form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    /// Reads a group from a settings value; blank values mean no group is enforced.
    pub fn from_setting(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }
}

/// Page the login redirect points at. Either a page id or an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageId(pub String);

/// Authenticated frontend user together with its group memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user: UserId,
    pub groups: BTreeSet<GroupId>,
}

impl Identity {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: UserId(user.into()),
            groups: BTreeSet::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(GroupId(group.into()));
        self
    }
}

/// One entry of the repeating language skills group on the form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LanguageSkill {
    pub language: Option<String>,
    pub level: Option<String>,
    pub text_language: Option<String>,
}

/// Strategy applied when an uploaded file name already exists in the target folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictMode {
    Rename,
    Replace,
    Cancel,
}

impl ConflictMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rename" | "renamefile" => Some(Self::Rename),
            "replace" | "overwrite" => Some(Self::Replace),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ConflictMode::Rename => "rename",
            ConflictMode::Replace => "replace",
            ConflictMode::Cancel => "cancel",
        }
    }
}

/// Reference to an uploaded file, resolved against the upload configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFileReference {
    pub original_name: String,
    pub target_path: String,
    pub content_type: String,
    pub size: u64,
    pub conflict_mode: ConflictMode,
}

/// Application data as mapped from the submitted form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub job: Option<JobId>,
    pub fields: BTreeMap<String, String>,
    pub dates: BTreeMap<String, NaiveDate>,
    pub language_skills: Vec<LanguageSkill>,
    pub files: Vec<UploadedFileReference>,
}

impl ApplicationDraft {
    pub fn birthday(&self) -> Option<NaiveDate> {
        self.dates.get("birthday").copied()
    }

    /// Whether the named property carries a usable value.
    pub fn has_value(&self, property: &str) -> bool {
        match property {
            "job" => self.job.is_some(),
            "languageSkills" => !self.language_skills.is_empty(),
            "files" => !self.files.is_empty(),
            other if self.dates.contains_key(other) => true,
            other => self
                .fields
                .get(other)
                .is_some_and(|value| !value.trim().is_empty()),
        }
    }
}

/// Lifecycle of a stored application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Draft,
    Submitted,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
        }
    }
}

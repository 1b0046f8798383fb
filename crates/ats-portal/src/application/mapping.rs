//! Declarative property mapping and validation settings for the application form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::ConflictMode;

/// Property receiving uploaded files.
pub const FILES_PROPERTY: &str = "files";
/// Repeating group of language skills.
pub const LANGUAGE_SKILLS_PROPERTY: &str = "languageSkills";

/// Where and how uploaded files are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfiguration {
    pub upload_folder: String,
    pub conflict_mode: ConflictMode,
    pub allowed_file_extensions: Vec<String>,
}

impl Default for UploadConfiguration {
    fn default() -> Self {
        Self {
            upload_folder: "1:/user_upload/applications".to_string(),
            conflict_mode: ConflictMode::Rename,
            allowed_file_extensions: vec![
                "pdf".to_string(),
                "doc".to_string(),
                "docx".to_string(),
                "jpg".to_string(),
                "png".to_string(),
            ],
        }
    }
}

impl UploadConfiguration {
    /// Parses a comma separated extension list, normalised to lower case.
    pub fn parse_extensions(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|extension| extension.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|extension| !extension.is_empty())
            .collect()
    }

    /// An empty allow-list accepts every extension.
    pub fn allows(&self, extension: &str) -> bool {
        self.allowed_file_extensions.is_empty()
            || self
                .allowed_file_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }
}

/// Allow-list for the entries of a repeating group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMapping {
    pub allowed_properties: Vec<String>,
    pub allow_creation: bool,
}

impl CollectionMapping {
    pub fn allows(&self, property: &str) -> bool {
        self.allowed_properties.iter().any(|allowed| allowed == property)
    }
}

/// Mapping rules handed to the binder for an `application` argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMappingConfiguration {
    /// chrono format string per date property.
    pub date_formats: BTreeMap<String, String>,
    pub upload: UploadConfiguration,
    pub collections: BTreeMap<String, CollectionMapping>,
}

impl PropertyMappingConfiguration {
    pub fn for_application(upload: UploadConfiguration) -> Self {
        let mut date_formats = BTreeMap::new();
        date_formats.insert("birthday".to_string(), "%Y-%m-%d".to_string());

        let mut collections = BTreeMap::new();
        collections.insert(
            LANGUAGE_SKILLS_PROPERTY.to_string(),
            CollectionMapping {
                allowed_properties: vec![
                    "language".to_string(),
                    "level".to_string(),
                    "textLanguage".to_string(),
                ],
                allow_creation: true,
            },
        );

        Self {
            date_formats,
            upload,
            collections,
        }
    }

    pub fn date_format(&self, property: &str) -> Option<&str> {
        self.date_formats.get(property).map(String::as_str)
    }

    pub fn collection(&self, property: &str) -> Option<&CollectionMapping> {
        self.collections.get(property)
    }
}

impl Default for PropertyMappingConfiguration {
    fn default() -> Self {
        Self::for_application(UploadConfiguration::default())
    }
}

/// Validation rules exposed to the form and enforced on submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSettings {
    pub required: Vec<String>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            required: vec![
                "firstname".to_string(),
                "surname".to_string(),
                "email".to_string(),
            ],
        }
    }
}

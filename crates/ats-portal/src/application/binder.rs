use std::path::Path;

use chrono::NaiveDate;

use super::arguments::{ArgumentValue, UploadedPart};
use super::domain::{ApplicationDraft, JobId, LanguageSkill, UploadedFileReference};
use super::mapping::{
    PropertyMappingConfiguration, ValidationSettings, FILES_PROPERTY, LANGUAGE_SKILLS_PROPERTY,
};

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("request carries no application payload")]
    MissingPayload,
    #[error("application payload must be a set of fields")]
    NotAMapping,
    #[error("property '{property}' is not allowed")]
    PropertyNotAllowed { property: String },
    #[error("creating entries for '{property}' is not allowed")]
    CreationNotAllowed { property: String },
    #[error("'{value}' in '{property}' does not match date format '{format}'")]
    InvalidDate {
        property: String,
        value: String,
        format: String,
    },
    #[error("file '{name}' has an extension that is not accepted")]
    FileExtensionNotAllowed { name: String },
    #[error("'{property}' expects an uploaded file, not a text value")]
    FileNotUploaded { property: String },
    #[error("missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<String>),
}

/// Maps an `application` payload onto an [`ApplicationDraft`].
pub struct ApplicationBinder<'a> {
    mapping: &'a PropertyMappingConfiguration,
}

impl<'a> ApplicationBinder<'a> {
    pub fn new(mapping: &'a PropertyMappingConfiguration) -> Self {
        Self { mapping }
    }

    pub fn bind(&self, payload: &ArgumentValue) -> Result<ApplicationDraft, BindingError> {
        let fields = payload.as_map().ok_or(BindingError::NotAMapping)?;
        let mut draft = ApplicationDraft::default();

        for (property, value) in fields {
            if property == "job" {
                draft.job = value.non_empty_scalar().map(|job| JobId(job.to_string()));
            } else if let Some(format) = self.mapping.date_format(property) {
                if let Some(date) = self.bind_date(property, value, format)? {
                    draft.dates.insert(property.clone(), date);
                }
            } else if property == FILES_PROPERTY {
                draft.files = self.bind_files(value)?;
            } else if property == LANGUAGE_SKILLS_PROPERTY {
                draft.language_skills = self.bind_language_skills(value)?;
            } else {
                match value {
                    ArgumentValue::Scalar(text) => {
                        draft.fields.insert(property.clone(), text.trim().to_string());
                    }
                    ArgumentValue::Map(_) | ArgumentValue::File(_) => {
                        return Err(BindingError::PropertyNotAllowed {
                            property: property.clone(),
                        })
                    }
                }
            }
        }

        Ok(draft)
    }

    fn bind_date(
        &self,
        property: &str,
        value: &ArgumentValue,
        format: &str,
    ) -> Result<Option<NaiveDate>, BindingError> {
        let raw = match value {
            ArgumentValue::Scalar(raw) => raw.trim(),
            ArgumentValue::Map(_) | ArgumentValue::File(_) => {
                return Err(BindingError::PropertyNotAllowed {
                    property: property.to_string(),
                })
            }
        };
        if raw.is_empty() {
            return Ok(None);
        }

        NaiveDate::parse_from_str(raw, format)
            .map(Some)
            .map_err(|_| BindingError::InvalidDate {
                property: property.to_string(),
                value: raw.to_string(),
                format: format.to_string(),
            })
    }

    /// Uploaded file parts become references into the upload folder.
    ///
    /// Browsers send an empty text value for a file input left blank; any
    /// other text value means the file never arrived as an upload.
    fn bind_files(
        &self,
        value: &ArgumentValue,
    ) -> Result<Vec<UploadedFileReference>, BindingError> {
        let entries = match value {
            ArgumentValue::Map(_) => value.indexed_entries(),
            ArgumentValue::Scalar(_) | ArgumentValue::File(_) => vec![("0", value)],
        };

        let mut parts = Vec::with_capacity(entries.len());
        for (index, entry) in entries {
            match entry {
                ArgumentValue::File(part) => parts.push(part),
                ArgumentValue::Scalar(_) if entry.non_empty_scalar().is_none() => {}
                ArgumentValue::Scalar(_) | ArgumentValue::Map(_) => {
                    return Err(BindingError::FileNotUploaded {
                        property: format!("{FILES_PROPERTY}.{index}"),
                    })
                }
            }
        }

        parts
            .into_iter()
            .map(|part| self.file_reference(part))
            .collect()
    }

    fn file_reference(&self, part: &UploadedPart) -> Result<UploadedFileReference, BindingError> {
        let upload = &self.mapping.upload;
        let file_name = sanitize_file_name(&part.file_name);
        let extension = Path::new(&file_name)
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default();
        if !upload.allows(extension) {
            return Err(BindingError::FileExtensionNotAllowed {
                name: part.file_name.clone(),
            });
        }

        Ok(UploadedFileReference {
            original_name: part.file_name.clone(),
            target_path: format!(
                "{}/{}",
                upload.upload_folder.trim_end_matches('/'),
                file_name
            ),
            content_type: content_type(part.content_type.as_deref(), &file_name)
                .essence_str()
                .to_string(),
            size: part.size,
            conflict_mode: upload.conflict_mode,
        })
    }

    fn bind_language_skills(
        &self,
        value: &ArgumentValue,
    ) -> Result<Vec<LanguageSkill>, BindingError> {
        let rules = self
            .mapping
            .collection(LANGUAGE_SKILLS_PROPERTY)
            .ok_or_else(|| BindingError::PropertyNotAllowed {
                property: LANGUAGE_SKILLS_PROPERTY.to_string(),
            })?;

        let entries = value.indexed_entries();
        if !entries.is_empty() && !rules.allow_creation {
            return Err(BindingError::CreationNotAllowed {
                property: format!("{LANGUAGE_SKILLS_PROPERTY}.*"),
            });
        }

        let mut skills = Vec::with_capacity(entries.len());
        for (index, entry) in entries {
            let properties = entry
                .as_map()
                .ok_or_else(|| BindingError::PropertyNotAllowed {
                    property: format!("{LANGUAGE_SKILLS_PROPERTY}.{index}"),
                })?;

            let mut skill = LanguageSkill::default();
            for (property, value) in properties {
                if !rules.allows(property) {
                    return Err(BindingError::PropertyNotAllowed {
                        property: format!("{LANGUAGE_SKILLS_PROPERTY}.{index}.{property}"),
                    });
                }
                let value = value.non_empty_scalar().map(ToString::to_string);
                match property.as_str() {
                    "language" => skill.language = value,
                    "level" => skill.level = value,
                    "textLanguage" => skill.text_language = value,
                    _ => {}
                }
            }

            if skill != LanguageSkill::default() {
                skills.push(skill);
            }
        }

        Ok(skills)
    }
}

impl ValidationSettings {
    /// Checks the required fields against a bound draft.
    pub fn check(&self, draft: &ApplicationDraft) -> Result<(), BindingError> {
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|property| !draft.has_value(property))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BindingError::MissingRequired(missing))
        }
    }
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|ch: char| ch == '/' || ch == '\\').next().unwrap_or(name);
    base.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Declared part type when it parses, otherwise guessed from the file name.
fn content_type(declared: Option<&str>, file_name: &str) -> mime::Mime {
    declared
        .and_then(|declared| declared.parse::<mime::Mime>().ok())
        .unwrap_or_else(|| {
            mime_guess::from_path(file_name).first_or(mime::APPLICATION_OCTET_STREAM)
        })
}

//! Decoding of submitted form bodies.
//!
//! The body is decoded before the access gate runs but a decoding failure is
//! only reported once the gate let the request through, so denied requests
//! are always answered with the login redirect.

use axum::body::to_bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;

use super::arguments::{RequestArguments, UploadedPart};

/// Largest body read for a submission.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("content type '{0}' is not accepted for form submissions")]
    UnsupportedMediaType(String),
    #[error("request body could not be read: {0}")]
    Unreadable(String),
    #[error("multipart body is malformed: {0}")]
    Multipart(String),
}

impl BodyError {
    pub fn status(&self) -> StatusCode {
        match self {
            BodyError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            BodyError::Unreadable(_) | BodyError::Multipart(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Reads URL-encoded or multipart form arguments from the request body.
///
/// A request without body and without content type carries no arguments.
pub async fn read_submission(request: Request) -> Result<RequestArguments, BodyError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let Some(content_type) = content_type else {
        let bytes = read_bytes(request).await?;
        return if bytes.is_empty() {
            Ok(RequestArguments::new())
        } else {
            Err(BodyError::UnsupportedMediaType("none".to_string()))
        };
    };

    let media = content_type
        .parse::<mime::Mime>()
        .map_err(|_| BodyError::UnsupportedMediaType(content_type.clone()))?;

    if media.type_() == mime::APPLICATION && media.subtype() == mime::WWW_FORM_URLENCODED {
        let bytes = read_bytes(request).await?;
        Ok(RequestArguments::from_pairs(
            url::form_urlencoded::parse(&bytes).into_owned(),
        ))
    } else if media.type_() == mime::MULTIPART && media.subtype() == mime::FORM_DATA {
        read_multipart(request).await
    } else {
        Err(BodyError::UnsupportedMediaType(content_type))
    }
}

async fn read_bytes(request: Request) -> Result<axum::body::Bytes, BodyError> {
    to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|error| BodyError::Unreadable(error.to_string()))
}

/// Text fields become scalars; file fields become [`UploadedPart`]s. File
/// inputs left blank arrive with an empty file name and are skipped.
async fn read_multipart(request: Request) -> Result<RequestArguments, BodyError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| BodyError::Multipart(rejection.body_text()))?;

    let mut arguments = RequestArguments::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| BodyError::Multipart(error.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match field.file_name().map(str::to_owned) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|error| BodyError::Multipart(error.body_text()))?;
                if !file_name.trim().is_empty() {
                    arguments.insert_file(
                        &name,
                        UploadedPart {
                            file_name,
                            content_type,
                            size: bytes.len() as u64,
                        },
                    );
                }
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|error| BodyError::Multipart(error.body_text()))?;
                arguments.insert(&name, text);
            }
        }
    }

    Ok(arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::arguments::ArgumentValue;
    use axum::body::Body;

    fn request(content_type: Option<&str>, body: &str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/application/save");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body.to_string())).expect("request")
    }

    #[tokio::test]
    async fn decodes_urlencoded_pairs() {
        let arguments = read_submission(request(
            Some("application/x-www-form-urlencoded; charset=utf-8"),
            "application%5Bjob%5D=5&note=a+b",
        ))
        .await
        .expect("body decodes");

        assert_eq!(
            arguments
                .get("application")
                .and_then(|application| application.get("job"))
                .and_then(ArgumentValue::as_scalar),
            Some("5")
        );
        assert_eq!(arguments.scalar("note"), Some("a b"));
    }

    #[tokio::test]
    async fn missing_body_carries_no_arguments() {
        let arguments = read_submission(request(None, ""))
            .await
            .expect("empty body accepted");
        assert!(arguments.is_empty());
    }

    #[tokio::test]
    async fn unknown_content_types_are_rejected() {
        let error = read_submission(request(Some("application/json"), "{\"job\":5}"))
            .await
            .expect_err("json is not a form body");
        assert_eq!(error.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let error = read_submission(request(None, "job=5"))
            .await
            .expect_err("untyped body");
        assert!(matches!(error, BodyError::UnsupportedMediaType(_)));
    }

    #[tokio::test]
    async fn multipart_fields_and_files_are_decoded() {
        let body = concat!(
            "--X\r\n",
            "Content-Disposition: form-data; name=\"application[job]\"\r\n\r\n",
            "5\r\n",
            "--X\r\n",
            "Content-Disposition: form-data; name=\"application[files][999]\"; filename=\"cv.pdf\"\r\n",
            "Content-Type: application/pdf\r\n\r\n",
            "%PDF-1.4\r\n",
            "--X\r\n",
            "Content-Disposition: form-data; name=\"application[files][1000]\"; filename=\"\"\r\n",
            "Content-Type: application/octet-stream\r\n\r\n",
            "\r\n",
            "--X--\r\n",
        );

        let arguments = read_submission(request(Some("multipart/form-data; boundary=X"), body))
            .await
            .expect("multipart decodes");
        let application = arguments.get("application").expect("application");
        assert_eq!(
            application.get("job").and_then(ArgumentValue::as_scalar),
            Some("5")
        );

        let files = application.get("files").expect("files");
        let uploads = files
            .indexed_entries()
            .into_iter()
            .filter(|(_, value)| value.as_file().is_some())
            .count();
        assert_eq!(uploads, 1);
        let part = files
            .get("999")
            .and_then(ArgumentValue::as_file)
            .expect("uploaded part");
        assert_eq!(part.file_name, "cv.pdf");
        assert_eq!(part.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(part.size, 8);
    }

    #[tokio::test]
    async fn malformed_multipart_is_a_bad_request() {
        let error = read_submission(request(Some("multipart/form-data"), "garbage"))
            .await
            .expect_err("boundary missing");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }
}

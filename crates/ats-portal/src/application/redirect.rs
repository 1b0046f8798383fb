//! Login redirect construction for requests that failed the access gate.
//!
//! Applications in progress are not tracked across the login round trip. The
//! redirect only carries the job, and once the user is back the repository can
//! find the application in progress for that job and user.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::arguments::{ArgumentValue, RequestArguments};
use super::domain::{ApplicationId, JobId, PageId};
use super::repository::{ApplicationRepository, RepositoryError};
use super::urls::{UrlBuildError, UrlBuilder, APPLICATION_FORM_MODULE, JOB_MODULE};

/// Query argument carrying the forward address for the login page.
pub const RETURN_URL_ARGUMENT: &str = "return_url";
/// Query argument carrying the job listing address for the login page.
pub const REFERRER_ARGUMENT: &str = "referrer";

/// Addresses handed to the login flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectTarget {
    pub return_url: String,
    pub referrer: String,
}

/// Fully built redirect to the login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRedirect {
    pub location: String,
    pub target: RedirectTarget,
}

/// Controller and action handling the request, reported in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub controller: String,
    pub action: String,
}

impl RequestOrigin {
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for RequestOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.controller, self.action)
    }
}

/// Where the job reference of a request was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSource {
    Argument,
    ApplicationPayload,
    StoredApplication,
}

#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    #[error("required argument \"job\" is not set for {controller}->{action}")]
    MissingJobContext { controller: String, action: String },
    #[error("application {application} could not be found to resolve its job")]
    LookupFailure { application: ApplicationId },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Url(#[from] UrlBuildError),
}

/// Rebuilds the job context of a request and turns it into login redirect URLs.
pub struct RedirectContextBuilder<R> {
    repository: Arc<R>,
    urls: Arc<dyn UrlBuilder>,
}

impl<R> RedirectContextBuilder<R>
where
    R: ApplicationRepository + 'static,
{
    pub fn new(repository: Arc<R>, urls: Arc<dyn UrlBuilder>) -> Self {
        Self { repository, urls }
    }

    /// Resolves the job of a request, trying the cheapest source first.
    ///
    /// An explicit `job` argument wins over an `application` payload. A
    /// structured payload is read directly; a scalar payload names a stored
    /// application and costs one repository lookup.
    pub fn resolve_job(
        &self,
        arguments: &RequestArguments,
        origin: &RequestOrigin,
    ) -> Result<(JobId, JobSource), RedirectError> {
        if let Some(job) = arguments.scalar("job") {
            return Ok((JobId(job.to_string()), JobSource::Argument));
        }

        match arguments.get("application") {
            Some(payload @ ArgumentValue::Map(_)) => {
                if let Some(job) = payload
                    .get("job")
                    .and_then(ArgumentValue::non_empty_scalar)
                {
                    return Ok((JobId(job.to_string()), JobSource::ApplicationPayload));
                }
            }
            Some(payload @ ArgumentValue::Scalar(_)) => {
                if let Some(id) = payload.non_empty_scalar() {
                    let application = ApplicationId(id.to_string());
                    let record = self.repository.find_by_identifier(&application)?;
                    return match record {
                        Some(record) => Ok((
                            record.job_reference().clone(),
                            JobSource::StoredApplication,
                        )),
                        None => {
                            warn!(
                                %application,
                                %origin,
                                "stored application not found while resolving job"
                            );
                            Err(RedirectError::LookupFailure { application })
                        }
                    };
                }
            }
            Some(ArgumentValue::File(_)) | None => {}
        }

        warn!(%origin, "request carries no job context");
        Err(RedirectError::MissingJobContext {
            controller: origin.controller.clone(),
            action: origin.action.clone(),
        })
    }

    /// Builds the return and referrer addresses for the job of the request.
    pub fn build(
        &self,
        arguments: &RequestArguments,
        origin: &RequestOrigin,
    ) -> Result<RedirectTarget, RedirectError> {
        let (job, source) = self.resolve_job(arguments, origin)?;
        debug!(%job, ?source, "resolved job for login redirect");
        self.target_for(&job)
    }

    pub fn target_for(&self, job: &JobId) -> Result<RedirectTarget, RedirectError> {
        let params = [("job", job.0.as_str())];
        let return_url = self
            .urls
            .url_for("form", &params, APPLICATION_FORM_MODULE, true)?;
        let referrer = self.urls.url_for("show", &params, JOB_MODULE, true)?;

        Ok(RedirectTarget {
            return_url,
            referrer,
        })
    }

    /// Redirect to the login page with both addresses attached.
    pub fn login_redirect(
        &self,
        arguments: &RequestArguments,
        origin: &RequestOrigin,
        login_page: &PageId,
    ) -> Result<LoginRedirect, RedirectError> {
        let target = self.build(arguments, origin)?;
        let location = self.urls.page_url(
            login_page,
            &[
                (RETURN_URL_ARGUMENT, target.return_url.as_str()),
                (REFERRER_ARGUMENT, target.referrer.as_str()),
            ],
        )?;

        Ok(LoginRedirect { location, target })
    }
}

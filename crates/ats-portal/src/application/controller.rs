use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use serde::Serialize;
use tracing::info;

use super::access::{AccessGate, AuthenticationService};
use super::arguments::RequestArguments;
use super::binder::{ApplicationBinder, BindingError};
use super::domain::{ApplicationId, ApplicationStatus, Identity, JobId, UserId};
use super::mapping::{PropertyMappingConfiguration, UploadConfiguration, ValidationSettings};
use super::redirect::{LoginRedirect, RedirectContextBuilder, RedirectError, RequestOrigin};
use super::repository::{
    ApplicationRecord, ApplicationRepository, ApplicationStatusView, RepositoryError,
};
use super::submission::BodyError;
use super::urls::{UrlBuildError, UrlBuilder, APPLICATION_FORM_MODULE};
use crate::config::PortalSettings;

/// Name reported in diagnostics for requests handled here.
pub const CONTROLLER_NAME: &str = "ApplicationFormController";

/// State handed to an action once the gate let the request through.
#[derive(Debug, Clone)]
pub struct FormContext {
    pub identity: Identity,
    /// Present only when the request carries an `application` argument.
    pub mapping: Option<PropertyMappingConfiguration>,
    pub validation: Option<ValidationSettings>,
}

/// Outcome of [`ApplicationController::initialize`].
#[derive(Debug, Clone)]
pub enum AccessDecision {
    Proceed(FormContext),
    Redirect(LoginRedirect),
}

/// Data needed to render the application form for a job.
#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    pub job: JobId,
    pub applicant: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationStatusView>,
    pub save_url: String,
    pub upload: UploadConfiguration,
    pub validation: ValidationSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Redirect(#[from] RedirectError),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Url(#[from] UrlBuildError),
    #[error(transparent)]
    Body(#[from] BodyError),
}

impl ControllerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ControllerError::Redirect(RedirectError::MissingJobContext { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ControllerError::Redirect(RedirectError::LookupFailure { .. }) => StatusCode::NOT_FOUND,
            ControllerError::Binding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ControllerError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            ControllerError::Body(error) => error.status(),
            ControllerError::Redirect(_)
            | ControllerError::Repository(_)
            | ControllerError::Url(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(id.to_string())
}

/// Access protection and actions of the application form.
pub struct ApplicationController<R, A> {
    gate: AccessGate<A>,
    redirects: RedirectContextBuilder<R>,
    repository: Arc<R>,
    urls: Arc<dyn UrlBuilder>,
    settings: PortalSettings,
    mapping: PropertyMappingConfiguration,
    validation: ValidationSettings,
}

impl<R, A> ApplicationController<R, A>
where
    R: ApplicationRepository + 'static,
    A: AuthenticationService + 'static,
{
    pub fn new(
        repository: Arc<R>,
        auth: Arc<A>,
        urls: Arc<dyn UrlBuilder>,
        settings: PortalSettings,
        mapping: PropertyMappingConfiguration,
    ) -> Self {
        Self {
            gate: AccessGate::new(auth),
            redirects: RedirectContextBuilder::new(repository.clone(), urls.clone()),
            repository,
            urls,
            settings,
            mapping,
            validation: ValidationSettings::default(),
        }
    }

    pub fn with_validation(mut self, validation: ValidationSettings) -> Self {
        self.validation = validation;
        self
    }

    pub fn settings(&self) -> &PortalSettings {
        &self.settings
    }

    /// Runs the access gate before anything else touches the request.
    ///
    /// Denied requests are answered with a login redirect and never reach the
    /// mapping configuration.
    pub fn initialize(
        &self,
        headers: &HeaderMap,
        arguments: &RequestArguments,
        action: &str,
    ) -> Result<AccessDecision, ControllerError> {
        let identity = self.gate.identify(headers);
        let required_group = self.settings.fe_user_group.as_ref();

        match identity {
            Some(identity) if self.gate.evaluate(Some(&identity), required_group) => {
                Ok(AccessDecision::Proceed(self.form_context(identity, arguments)))
            }
            identity => {
                let origin = RequestOrigin::new(CONTROLLER_NAME, action);
                let redirect =
                    self.redirects
                        .login_redirect(arguments, &origin, &self.settings.login_page)?;
                info!(
                    authenticated = identity.is_some(),
                    group = required_group.map(|group| group.0.as_str()),
                    return_url = %redirect.target.return_url,
                    "access denied, redirecting to login"
                );
                Ok(AccessDecision::Redirect(redirect))
            }
        }
    }

    fn form_context(&self, identity: Identity, arguments: &RequestArguments) -> FormContext {
        if arguments.has("application") {
            FormContext {
                identity,
                mapping: Some(self.mapping.clone()),
                validation: Some(self.validation.clone()),
            }
        } else {
            FormContext {
                identity,
                mapping: None,
                validation: None,
            }
        }
    }

    /// Form for the requested job, prefilled with the application in progress.
    pub fn form(
        &self,
        context: &FormContext,
        arguments: &RequestArguments,
    ) -> Result<FormView, ControllerError> {
        let origin = RequestOrigin::new(CONTROLLER_NAME, "form");
        let (job, _) = self.redirects.resolve_job(arguments, &origin)?;
        let application = self
            .repository
            .find_in_progress(&job, &context.identity.user)?
            .map(|record| record.status_view());
        let save_url = self
            .urls
            .url_for("save", &[], APPLICATION_FORM_MODULE, false)?;

        Ok(FormView {
            job,
            applicant: context.identity.user.clone(),
            application,
            save_url,
            upload: self.mapping.upload.clone(),
            validation: context
                .validation
                .clone()
                .unwrap_or_else(|| self.validation.clone()),
        })
    }

    /// Binds the submitted payload and stores it as the application in progress.
    pub fn save(
        &self,
        context: &FormContext,
        arguments: &RequestArguments,
    ) -> Result<ApplicationRecord, ControllerError> {
        let payload = arguments
            .get("application")
            .ok_or(BindingError::MissingPayload)?;
        let mapping = context.mapping.as_ref().unwrap_or(&self.mapping);
        let mut draft = ApplicationBinder::new(mapping).bind(payload)?;

        let job = match draft.job.clone() {
            Some(job) => job,
            None => {
                let origin = RequestOrigin::new(CONTROLLER_NAME, "save");
                self.redirects.resolve_job(arguments, &origin)?.0
            }
        };
        draft.job = Some(job.clone());

        context
            .validation
            .as_ref()
            .unwrap_or(&self.validation)
            .check(&draft)?;

        let applicant = context.identity.user.clone();
        let application_id = match self.repository.find_in_progress(&job, &applicant)? {
            Some(existing) => existing.application_id,
            None => next_application_id(),
        };

        let stored = self.repository.save(ApplicationRecord {
            application_id,
            job,
            applicant,
            status: ApplicationStatus::Draft,
            draft,
        })?;
        info!(
            application = %stored.application_id,
            job = %stored.job,
            "application saved"
        );
        Ok(stored)
    }
}

//! Job application form: access gate, login redirect and form binding.
//!
//! Every request first passes the [`AccessGate`]. Denied requests are turned
//! into a redirect to the login page that carries the job the user was
//! applying for; granted requests continue to the form actions of the
//! [`ApplicationController`].

pub mod access;
pub mod arguments;
pub mod binder;
pub mod controller;
pub mod domain;
pub mod mapping;
pub mod redirect;
pub mod repository;
pub mod router;
pub mod session;
pub mod submission;
pub mod urls;

#[cfg(test)]
mod tests;

pub use access::{AccessGate, AuthenticationService};
pub use arguments::{ArgumentValue, RequestArguments, UploadedPart, MAX_KEY_DEPTH};
pub use binder::{ApplicationBinder, BindingError};
pub use controller::{
    AccessDecision, ApplicationController, ControllerError, FormContext, FormView,
};
pub use domain::{
    ApplicationDraft, ApplicationId, ApplicationStatus, ConflictMode, GroupId, Identity, JobId,
    LanguageSkill, PageId, UploadedFileReference, UserId,
};
pub use mapping::{
    CollectionMapping, PropertyMappingConfiguration, UploadConfiguration, ValidationSettings,
};
pub use redirect::{
    JobSource, LoginRedirect, RedirectContextBuilder, RedirectError, RedirectTarget,
    RequestOrigin, REFERRER_ARGUMENT, RETURN_URL_ARGUMENT,
};
pub use repository::{
    ApplicationRecord, ApplicationRepository, ApplicationStatusView, RepositoryError,
};
pub use router::application_router;
pub use session::{SessionAuthenticator, SESSION_COOKIE};
pub use submission::{read_submission, BodyError, MAX_BODY_BYTES};
pub use urls::{RouteTable, UrlBuildError, UrlBuilder, APPLICATION_FORM_MODULE, JOB_MODULE};

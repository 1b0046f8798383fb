use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::Value;
use url::Url;

use crate::application::access::AuthenticationService;
use crate::application::domain::{
    ApplicationDraft, ApplicationId, ApplicationStatus, GroupId, Identity, JobId, PageId, UserId,
};
use crate::application::mapping::PropertyMappingConfiguration;
use crate::application::repository::{ApplicationRecord, ApplicationRepository, RepositoryError};
use crate::application::urls::{RouteTable, UrlBuilder};
use crate::application::{application_router, ApplicationController, RedirectContextBuilder};
use crate::config::PortalSettings;

pub(super) const BASE_URL: &str = "https://jobs.example.org/";

pub(super) fn routes() -> Arc<dyn UrlBuilder> {
    Arc::new(RouteTable::standard(
        Url::parse(BASE_URL).expect("valid base url"),
    ))
}

pub(super) fn settings(group: Option<&str>) -> PortalSettings {
    PortalSettings {
        base_url: Url::parse(BASE_URL).expect("valid base url"),
        fe_user_group: group.and_then(GroupId::from_setting),
        login_page: PageId("login".to_string()),
    }
}

pub(super) fn jane() -> Identity {
    Identity::new("jane").with_group("applicants")
}

pub(super) fn stored_record(id: &str, job: &str, applicant: &str) -> ApplicationRecord {
    ApplicationRecord {
        application_id: ApplicationId(id.to_string()),
        job: JobId(job.to_string()),
        applicant: UserId(applicant.to_string()),
        status: ApplicationStatus::Draft,
        draft: ApplicationDraft {
            job: Some(JobId(job.to_string())),
            ..ApplicationDraft::default()
        },
    }
}

/// Authenticator answering every request with the same identity.
pub(super) struct StaticAuthenticator {
    pub(super) identity: Option<Identity>,
}

impl StaticAuthenticator {
    pub(super) fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub(super) fn anonymous() -> Self {
        Self { identity: None }
    }
}

impl AuthenticationService for StaticAuthenticator {
    fn current_identity(&self, _headers: &HeaderMap) -> Option<Identity> {
        self.identity.clone()
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl MemoryRepository {
    pub(super) fn with_record(record: ApplicationRecord) -> Self {
        let repository = Self::default();
        repository
            .records
            .lock()
            .expect("repository mutex poisoned")
            .insert(record.application_id.clone(), record);
        repository
    }

    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl ApplicationRepository for MemoryRepository {
    fn find_by_identifier(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_in_progress(
        &self,
        job: &JobId,
        applicant: &UserId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|record| {
                &record.job == job
                    && &record.applicant == applicant
                    && record.status == ApplicationStatus::Draft
            })
            .cloned())
    }

    fn save(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.application_id.clone(), record.clone());
        Ok(record)
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn find_by_identifier(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_in_progress(
        &self,
        _job: &JobId,
        _applicant: &UserId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn redirect_builder<R>(repository: R) -> RedirectContextBuilder<R>
where
    R: ApplicationRepository + 'static,
{
    RedirectContextBuilder::new(Arc::new(repository), routes())
}

pub(super) fn build_controller<R>(
    repository: Arc<R>,
    auth: StaticAuthenticator,
    group: Option<&str>,
) -> ApplicationController<R, StaticAuthenticator>
where
    R: ApplicationRepository + 'static,
{
    ApplicationController::new(
        repository,
        Arc::new(auth),
        routes(),
        settings(group),
        PropertyMappingConfiguration::default(),
    )
}

pub(super) fn router_for<R>(controller: ApplicationController<R, StaticAuthenticator>) -> axum::Router
where
    R: ApplicationRepository + 'static,
{
    application_router(Arc::new(controller))
}

pub(super) fn query_value(location: &str, name: &str) -> Option<String> {
    Url::parse(location)
        .expect("absolute location")
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

use ats_portal::application::{
    ApplicationId, ApplicationRecord, ApplicationRepository, ApplicationStatus,
    AuthenticationService, Identity, JobId, RepositoryError, UserId,
};
use axum::http::HeaderMap;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

/// Header carrying the user name set by the authenticating proxy.
pub(crate) const USER_HEADER: &str = "x-authenticated-user";
/// Comma separated group memberships set by the authenticating proxy.
pub(crate) const GROUPS_HEADER: &str = "x-authenticated-groups";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
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
        if let Some(existing) = guard.get(&record.application_id) {
            if existing.applicant != record.applicant {
                return Err(RepositoryError::Conflict);
            }
        }
        guard.insert(record.application_id.clone(), record.clone());
        Ok(record)
    }
}

/// Trusts the identity headers of an authenticating reverse proxy.
#[derive(Default, Clone)]
pub(crate) struct ForwardedIdentityAuthenticator;

impl AuthenticationService for ForwardedIdentityAuthenticator {
    fn current_identity(&self, headers: &HeaderMap) -> Option<Identity> {
        let user = headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())?;

        let groups = headers
            .get(GROUPS_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|group| !group.is_empty());

        Some(groups.fold(Identity::new(user), |identity, group| {
            identity.with_group(group)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ats_portal::application::GroupId;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_headers_become_identity() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("jane"));
        headers.insert(GROUPS_HEADER, HeaderValue::from_static("applicants, staff,"));

        let identity = ForwardedIdentityAuthenticator
            .current_identity(&headers)
            .expect("identity present");
        assert_eq!(identity.user, UserId("jane".to_string()));
        assert!(identity.groups.contains(&GroupId("applicants".to_string())));
        assert!(identity.groups.contains(&GroupId("staff".to_string())));
        assert_eq!(identity.groups.len(), 2);
    }

    #[test]
    fn blank_user_header_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("  "));
        assert!(ForwardedIdentityAuthenticator
            .current_identity(&headers)
            .is_none());
        assert!(ForwardedIdentityAuthenticator
            .current_identity(&HeaderMap::new())
            .is_none());
    }

    #[test]
    fn saving_over_another_applicants_record_conflicts() {
        let repository = InMemoryApplicationRepository::default();
        let record = ApplicationRecord {
            application_id: ApplicationId("1".to_string()),
            job: JobId("5".to_string()),
            applicant: UserId("jane".to_string()),
            status: ApplicationStatus::Draft,
            draft: Default::default(),
        };
        repository.save(record.clone()).expect("first save");

        let foreign = ApplicationRecord {
            applicant: UserId("bob".to_string()),
            ..record
        };
        assert!(matches!(
            repository.save(foreign),
            Err(RepositoryError::Conflict)
        ));
    }
}

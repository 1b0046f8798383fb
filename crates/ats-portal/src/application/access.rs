use std::sync::Arc;

use axum::http::HeaderMap;

use super::domain::{GroupId, Identity};

/// Authentication collaborator resolving the frontend user of a request.
pub trait AuthenticationService: Send + Sync {
    fn current_identity(&self, headers: &HeaderMap) -> Option<Identity>;

    fn is_member(&self, identity: &Identity, group: &GroupId) -> bool {
        identity.groups.contains(group)
    }
}

/// Predicate guarding the application form.
///
/// Without a configured group any authenticated user passes; with a group the
/// user must also be a member of it.
pub struct AccessGate<A> {
    auth: Arc<A>,
}

impl<A> AccessGate<A>
where
    A: AuthenticationService + 'static,
{
    pub fn new(auth: Arc<A>) -> Self {
        Self { auth }
    }

    pub fn identify(&self, headers: &HeaderMap) -> Option<Identity> {
        self.auth.current_identity(headers)
    }

    pub fn evaluate(&self, identity: Option<&Identity>, required_group: Option<&GroupId>) -> bool {
        match (identity, required_group) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(identity), Some(group)) => self.auth.is_member(identity, group),
        }
    }
}

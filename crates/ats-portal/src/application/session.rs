use std::collections::HashMap;
use std::sync::RwLock;

use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;

use super::access::AuthenticationService;
use super::domain::Identity;

/// Cookie carrying the frontend user session.
pub const SESSION_COOKIE: &str = "fe_typo_user";

/// In-memory session store keyed by the frontend session cookie.
#[derive(Default)]
pub struct SessionAuthenticator {
    sessions: RwLock<HashMap<String, Identity>>,
}

impl SessionAuthenticator {
    pub fn open_session(&self, token: impl Into<String>, identity: Identity) {
        self.sessions
            .write()
            .expect("session lock poisoned")
            .insert(token.into(), identity);
    }

    pub fn close_session(&self, token: &str) -> Option<Identity> {
        self.sessions
            .write()
            .expect("session lock poisoned")
            .remove(token)
    }
}

impl AuthenticationService for SessionAuthenticator {
    fn current_identity(&self, headers: &HeaderMap) -> Option<Identity> {
        let token = cookie_value(headers, SESSION_COOKIE)?;
        self.sessions
            .read()
            .expect("session lock poisoned")
            .get(&token)
            .cloned()
    }
}

/// Value of the named cookie across all `Cookie` headers of the request.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

use std::collections::BTreeMap;

use url::{Position, Url};

use super::domain::PageId;

/// Module serving the application form and its submission.
pub const APPLICATION_FORM_MODULE: &str = "application/form";
/// Module serving the public job listing.
pub const JOB_MODULE: &str = "job";

/// URL building collaborator.
pub trait UrlBuilder: Send + Sync {
    fn url_for(
        &self,
        action: &str,
        params: &[(&str, &str)],
        module: &str,
        absolute: bool,
    ) -> Result<String, UrlBuildError>;

    /// Absolute URL of a CMS page with the given query arguments attached.
    ///
    /// Only `http` and `https` URLs are taken as absolute pages; anything
    /// else is a page id.
    fn page_url(&self, page: &PageId, params: &[(&str, &str)]) -> Result<String, UrlBuildError>;
}

#[derive(Debug, thiserror::Error)]
pub enum UrlBuildError {
    #[error("no route registered for action '{action}' in module '{module}'")]
    UnknownRoute { module: String, action: String },
    #[error("route '{pattern}' requires parameter '{name}'")]
    MissingParameter { pattern: String, name: String },
    #[error("base url '{0}' cannot carry a path")]
    NotHierarchical(String),
    #[error("invalid url: {0}")]
    Invalid(#[from] url::ParseError),
}

/// Route patterns resolved against a single base URL.
///
/// Pattern segments written as `{name}` are filled from the parameters; all
/// remaining parameters are appended as query arguments.
#[derive(Debug, Clone)]
pub struct RouteTable {
    base: Url,
    routes: BTreeMap<(String, String), String>,
}

impl RouteTable {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            routes: BTreeMap::new(),
        }
    }

    /// Routes for the form, saving it and the job detail page.
    pub fn standard(base: Url) -> Self {
        Self::new(base)
            .with_route(APPLICATION_FORM_MODULE, "form", "application/form")
            .with_route(APPLICATION_FORM_MODULE, "save", "application/save")
            .with_route(JOB_MODULE, "show", "job/{job}")
    }

    pub fn with_route(mut self, module: &str, action: &str, pattern: &str) -> Self {
        self.routes.insert(
            (module.to_string(), action.to_string()),
            pattern.trim_matches('/').to_string(),
        );
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

impl UrlBuilder for RouteTable {
    fn url_for(
        &self,
        action: &str,
        params: &[(&str, &str)],
        module: &str,
        absolute: bool,
    ) -> Result<String, UrlBuildError> {
        let pattern = self
            .routes
            .get(&(module.to_string(), action.to_string()))
            .ok_or_else(|| UrlBuildError::UnknownRoute {
                module: module.to_string(),
                action: action.to_string(),
            })?;

        let mut consumed = Vec::new();
        let mut segments = Vec::new();
        for segment in pattern.split('/').filter(|segment| !segment.is_empty()) {
            match segment
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
            {
                Some(name) => {
                    let value = params
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| UrlBuildError::MissingParameter {
                            pattern: pattern.clone(),
                            name: name.to_string(),
                        })?;
                    consumed.push(name);
                    segments.push(value);
                }
                None => segments.push(segment),
            }
        }

        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| UrlBuildError::NotHierarchical(self.base.to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }

        let query: Vec<_> = params
            .iter()
            .filter(|(key, _)| !consumed.contains(key))
            .collect();
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        if absolute {
            Ok(url.to_string())
        } else {
            Ok(url[Position::BeforePath..].to_string())
        }
    }

    fn page_url(&self, page: &PageId, params: &[(&str, &str)]) -> Result<String, UrlBuildError> {
        let absolute = Url::parse(page.0.trim())
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"));
        let mut url = match absolute {
            Some(url) => url,
            None => {
                let mut url = self.base.clone();
                url.set_fragment(None);
                url.query_pairs_mut().clear().append_pair("id", page.0.trim());
                url
            }
        };

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url.to_string())
    }
}

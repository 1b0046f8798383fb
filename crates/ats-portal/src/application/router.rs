use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};

use super::access::AuthenticationService;
use super::arguments::RequestArguments;
use super::controller::{AccessDecision, ApplicationController, ControllerError};
use super::repository::ApplicationRepository;
use super::submission::read_submission;
use crate::error::AppError;

type Pairs = Vec<(String, String)>;

/// Router builder exposing the gated form endpoints.
pub fn application_router<R, A>(controller: Arc<ApplicationController<R, A>>) -> Router
where
    R: ApplicationRepository + 'static,
    A: AuthenticationService + 'static,
{
    Router::new()
        .route("/application/form", get(form_handler::<R, A>))
        .route("/application/save", post(save_handler::<R, A>))
        .with_state(controller)
}

pub(crate) async fn form_handler<R, A>(
    State(controller): State<Arc<ApplicationController<R, A>>>,
    headers: HeaderMap,
    Query(query): Query<Pairs>,
) -> Result<Response, AppError>
where
    R: ApplicationRepository + 'static,
    A: AuthenticationService + 'static,
{
    let arguments = RequestArguments::from_pairs(query);
    let context = match controller.initialize(&headers, &arguments, "form")? {
        AccessDecision::Proceed(context) => context,
        AccessDecision::Redirect(redirect) => {
            return Ok(Redirect::to(&redirect.location).into_response())
        }
    };

    let view = controller.form(&context, &arguments)?;
    Ok((StatusCode::OK, axum::Json(view)).into_response())
}

/// The body is decoded ahead of the gate so a denied submission still yields
/// its job, but decoding errors only surface for admitted requests.
pub(crate) async fn save_handler<R, A>(
    State(controller): State<Arc<ApplicationController<R, A>>>,
    headers: HeaderMap,
    Query(query): Query<Pairs>,
    request: Request,
) -> Result<Response, AppError>
where
    R: ApplicationRepository + 'static,
    A: AuthenticationService + 'static,
{
    let mut arguments = RequestArguments::from_pairs(query);
    let body = match read_submission(request).await {
        Ok(submitted) => {
            arguments.merge(submitted);
            Ok(())
        }
        Err(error) => Err(error),
    };

    let context = match controller.initialize(&headers, &arguments, "save")? {
        AccessDecision::Proceed(context) => context,
        AccessDecision::Redirect(redirect) => {
            return Ok(Redirect::to(&redirect.location).into_response())
        }
    };
    body.map_err(ControllerError::from)?;

    let record = controller.save(&context, &arguments)?;
    Ok((StatusCode::CREATED, axum::Json(record.status_view())).into_response())
}

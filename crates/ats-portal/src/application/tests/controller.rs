use super::common::*;
use crate::application::arguments::{RequestArguments, UploadedPart};
use crate::application::binder::BindingError;
use crate::application::controller::{AccessDecision, ControllerError};
use crate::application::domain::{ApplicationStatus, Identity, JobId};
use crate::application::redirect::RedirectError;
use axum::http::{HeaderMap, StatusCode};
use std::sync::Arc;

fn complete_application(job: &str) -> RequestArguments {
    let mut arguments = RequestArguments::from_pairs([
        ("application[job]", job),
        ("application[firstname]", "Jane"),
        ("application[surname]", "Doe"),
        ("application[email]", "jane@example.org"),
        ("application[birthday]", "1990-04-12"),
        ("application[languageSkills][0][language]", "en"),
        ("application[languageSkills][0][level]", "C2"),
    ]);
    arguments.insert_file(
        "application[files][999]",
        UploadedPart {
            file_name: "cv.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            size: 4096,
        },
    );
    arguments
}

#[test]
fn denied_requests_are_redirected_without_mapping() {
    let controller = build_controller(
        Arc::new(MemoryRepository::default()),
        StaticAuthenticator::anonymous(),
        None,
    );

    let decision = controller
        .initialize(&HeaderMap::new(), &complete_application("5"), "save")
        .expect("gate evaluates");

    match decision {
        AccessDecision::Redirect(redirect) => {
            assert_eq!(
                redirect.target.return_url,
                "https://jobs.example.org/application/form?job=5"
            );
            assert_eq!(redirect.target.referrer, "https://jobs.example.org/job/5");
        }
        AccessDecision::Proceed(_) => panic!("anonymous request must not proceed"),
    }
}

#[test]
fn users_outside_required_group_are_redirected() {
    let controller = build_controller(
        Arc::new(MemoryRepository::default()),
        StaticAuthenticator::signed_in(Identity::new("bob")),
        Some("applicants"),
    );

    let decision = controller
        .initialize(
            &HeaderMap::new(),
            &RequestArguments::from_pairs([("job", "5")]),
            "form",
        )
        .expect("gate evaluates");
    assert!(matches!(decision, AccessDecision::Redirect(_)));
}

#[test]
fn denied_requests_without_job_fail() {
    let controller = build_controller(
        Arc::new(MemoryRepository::default()),
        StaticAuthenticator::anonymous(),
        None,
    );

    let error = controller
        .initialize(&HeaderMap::new(), &RequestArguments::new(), "form")
        .expect_err("no job context");
    assert!(matches!(
        error,
        ControllerError::Redirect(RedirectError::MissingJobContext { .. })
    ));
    assert_eq!(error.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn granted_requests_get_mapping_only_with_application_argument() {
    let controller = build_controller(
        Arc::new(MemoryRepository::default()),
        StaticAuthenticator::signed_in(jane()),
        Some("applicants"),
    );

    let with_payload = controller
        .initialize(&HeaderMap::new(), &complete_application("5"), "save")
        .expect("gate evaluates");
    match with_payload {
        AccessDecision::Proceed(context) => {
            assert_eq!(context.identity, jane());
            assert!(context.mapping.is_some());
            assert!(context.validation.is_some());
        }
        AccessDecision::Redirect(_) => panic!("member must proceed"),
    }

    let without_payload = controller
        .initialize(
            &HeaderMap::new(),
            &RequestArguments::from_pairs([("job", "5")]),
            "form",
        )
        .expect("gate evaluates");
    match without_payload {
        AccessDecision::Proceed(context) => {
            assert!(context.mapping.is_none());
            assert!(context.validation.is_none());
        }
        AccessDecision::Redirect(_) => panic!("member must proceed"),
    }
}

#[test]
fn granted_requests_never_need_job_context() {
    let controller = build_controller(
        Arc::new(MemoryRepository::default()),
        StaticAuthenticator::signed_in(jane()),
        None,
    );

    let decision = controller
        .initialize(&HeaderMap::new(), &RequestArguments::new(), "form")
        .expect("gate evaluates");
    assert!(matches!(decision, AccessDecision::Proceed(_)));
}

#[test]
fn save_stores_application_in_progress_and_reuses_it() {
    let repository = Arc::new(MemoryRepository::default());
    let controller = build_controller(
        repository.clone(),
        StaticAuthenticator::signed_in(jane()),
        None,
    );
    let arguments = complete_application("5");

    let AccessDecision::Proceed(context) = controller
        .initialize(&HeaderMap::new(), &arguments, "save")
        .expect("gate evaluates")
    else {
        panic!("signed in user must proceed");
    };

    let first = controller.save(&context, &arguments).expect("save succeeds");
    assert_eq!(first.job, JobId("5".to_string()));
    assert_eq!(first.status, ApplicationStatus::Draft);
    assert_eq!(first.draft.language_skills.len(), 1);
    assert_eq!(first.draft.files.len(), 1);

    let second = controller.save(&context, &arguments).expect("save succeeds");
    assert_eq!(second.application_id, first.application_id);
    assert_eq!(repository.len(), 1);

    let view = controller
        .form(&context, &RequestArguments::from_pairs([("job", "5")]))
        .expect("form renders");
    let application = view.application.expect("application in progress");
    assert_eq!(application.application_id, first.application_id);
    assert_eq!(view.save_url, "/application/save");
}

#[test]
fn save_reports_missing_required_fields() {
    let controller = build_controller(
        Arc::new(MemoryRepository::default()),
        StaticAuthenticator::signed_in(jane()),
        None,
    );
    let arguments = RequestArguments::from_pairs([
        ("application[job]", "5"),
        ("application[firstname]", "Jane"),
    ]);
    let AccessDecision::Proceed(context) = controller
        .initialize(&HeaderMap::new(), &arguments, "save")
        .expect("gate evaluates")
    else {
        panic!("signed in user must proceed");
    };

    let error = controller
        .save(&context, &arguments)
        .expect_err("validation fails");
    assert!(matches!(
        error,
        ControllerError::Binding(BindingError::MissingRequired(_))
    ));
    assert_eq!(error.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
fn save_takes_job_from_query_when_payload_lacks_it() {
    let controller = build_controller(
        Arc::new(MemoryRepository::default()),
        StaticAuthenticator::signed_in(jane()),
        None,
    );
    let mut arguments = complete_application("");
    arguments.merge(RequestArguments::from_pairs([("job", "11")]));
    let AccessDecision::Proceed(context) = controller
        .initialize(&HeaderMap::new(), &arguments, "save")
        .expect("gate evaluates")
    else {
        panic!("signed in user must proceed");
    };

    let record = controller.save(&context, &arguments).expect("save succeeds");
    assert_eq!(record.job, JobId("11".to_string()));
    assert_eq!(record.draft.job, Some(JobId("11".to_string())));
}

#[test]
fn form_resolves_job_of_resumed_application() {
    let repository = Arc::new(MemoryRepository::with_record(stored_record(
        "17", "9", "jane",
    )));
    let controller = build_controller(
        repository,
        StaticAuthenticator::signed_in(jane()),
        None,
    );
    let arguments = RequestArguments::from_pairs([("application", "17")]);
    let AccessDecision::Proceed(context) = controller
        .initialize(&HeaderMap::new(), &arguments, "form")
        .expect("gate evaluates")
    else {
        panic!("signed in user must proceed");
    };

    let view = controller.form(&context, &arguments).expect("form renders");
    assert_eq!(view.job, JobId("9".to_string()));
    assert!(view.application.is_some());
}

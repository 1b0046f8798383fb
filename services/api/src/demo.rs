use crate::infra::InMemoryApplicationRepository;
use ats_portal::application::{
    AccessDecision, ApplicationController, FormContext, GroupId, Identity, PageId,
    PropertyMappingConfiguration, RequestArguments, RouteTable, SessionAuthenticator,
    UploadedPart, SESSION_COOKIE,
};
use ats_portal::config::PortalSettings;
use ats_portal::error::AppError;
use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use clap::Args;
use std::sync::Arc;
use url::Url;

const DEMO_SESSION: &str = "demo-session";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Base URL the generated links are resolved against
    #[arg(long, default_value = "https://jobs.example.org/")]
    pub(crate) base_url: Url,
    /// Job the applicant is applying for
    #[arg(long, default_value = "42")]
    pub(crate) job: String,
    /// Login page id or absolute login URL
    #[arg(long, default_value = "login")]
    pub(crate) login_page: String,
    /// Frontend group required to open the form
    #[arg(long)]
    pub(crate) group: Option<String>,
}

type DemoController = ApplicationController<InMemoryApplicationRepository, SessionAuthenticator>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        base_url,
        job,
        login_page,
        group,
    } = args;

    let sessions = Arc::new(SessionAuthenticator::default());
    let fe_user_group = group.as_deref().and_then(GroupId::from_setting);
    let controller: DemoController = ApplicationController::new(
        Arc::new(InMemoryApplicationRepository::default()),
        sessions.clone(),
        Arc::new(RouteTable::standard(base_url.clone())),
        PortalSettings {
            base_url,
            fe_user_group: fe_user_group.clone(),
            login_page: PageId(login_page),
        },
        PropertyMappingConfiguration::default(),
    );

    println!("Application portal demo");
    let mut submission = RequestArguments::from_pairs([
        ("application[job]", job.as_str()),
        ("application[firstname]", "Ada"),
        ("application[surname]", "Lovelace"),
        ("application[email]", "ada@example.org"),
        ("application[birthday]", "1990-12-10"),
        ("application[languageSkills][0][language]", "en"),
        ("application[languageSkills][0][level]", "C2"),
    ]);
    submission.insert_file(
        "application[files][]",
        UploadedPart {
            file_name: "cover-letter.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            size: 48_213,
        },
    );

    println!("\n1. Anonymous visitor submits the form");
    match controller.initialize(&HeaderMap::new(), &submission, "save")? {
        AccessDecision::Redirect(redirect) => {
            println!("   redirected to  {}", redirect.location);
            println!("   return url     {}", redirect.target.return_url);
            println!("   referrer       {}", redirect.target.referrer);
        }
        AccessDecision::Proceed(_) => println!("   unexpectedly admitted"),
    }

    let mut identity = Identity::new("ada");
    if let Some(group) = &fe_user_group {
        identity = identity.with_group(group.0.clone());
    }
    sessions.open_session(DEMO_SESSION, identity.clone());
    let headers = session_headers();
    println!("\n2. Visitor logs in and returns to the form");

    let Some(context) = admitted(&controller, &headers, &submission, "save")? else {
        return Ok(());
    };
    let record = controller.save(&context, &submission)?;
    println!(
        "   saved application {} for job {} ({} language skill(s), {} file(s))",
        record.application_id,
        record.job,
        record.draft.language_skills.len(),
        record.draft.files.len()
    );
    for file in &record.draft.files {
        println!(
            "   file {} -> {} [{}, {} bytes]",
            file.original_name, file.target_path, file.content_type, file.size
        );
    }

    println!("\n3. Session expires while the application is open");
    sessions.close_session(DEMO_SESSION);
    let resume = RequestArguments::from_pairs([("application", record.application_id.0.as_str())]);
    match controller.initialize(&headers, &resume, "form")? {
        AccessDecision::Redirect(redirect) => {
            println!("   redirected to  {}", redirect.location);
            println!("   job recovered from the stored application");
        }
        AccessDecision::Proceed(_) => println!("   unexpectedly admitted"),
    }

    println!("\n4. Visitor logs in again and resumes");
    sessions.open_session(DEMO_SESSION, identity);
    let Some(context) = admitted(&controller, &headers, &resume, "form")? else {
        return Ok(());
    };
    let view = controller.form(&context, &resume)?;
    match &view.application {
        Some(application) => println!(
            "   form for job {} resumes application {} ({})",
            view.job, application.application_id, application.status
        ),
        None => println!("   form for job {} starts a new application", view.job),
    }
    println!("   form posts to {}", view.save_url);

    Ok(())
}

fn session_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("{SESSION_COOKIE}={DEMO_SESSION}")) {
        headers.insert(COOKIE, value);
    }
    headers
}

fn admitted(
    controller: &DemoController,
    headers: &HeaderMap,
    arguments: &RequestArguments,
    action: &str,
) -> Result<Option<FormContext>, AppError> {
    match controller.initialize(headers, arguments, action)? {
        AccessDecision::Proceed(context) => Ok(Some(context)),
        AccessDecision::Redirect(redirect) => {
            println!("   still denied, redirected to {}", redirect.location);
            Ok(None)
        }
    }
}

//! End-to-end tests driving a live Registration Service over TCP

use axum::{body::Bytes, http::StatusCode, routing::post, Json, Router};
use enrollment_common::{NewAttachment, DEFAULT_TICKET_FLOOR};
use registration_service::{
    attachments::AttachmentStore, counter::TicketCounter, create_router,
    storage::RegistrationStore, AppState, RegistrationService,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use submission_client::{
    RegistrationClient, RegistrationSession, SubmissionState, SubmitOutcome,
};
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Serve `app` on an ephemeral port and return its base URL
async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Start a Registration Service on an ephemeral port
async fn start_service() -> (String, RegistrationService) {
    let service = RegistrationService::in_memory(DEFAULT_TICKET_FLOOR, Duration::from_secs(5));
    let app = create_router(AppState::new(service.clone(), 1024 * 1024));

    (serve(app).await, service)
}

/// Base URL of a port nobody listens on
async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    format!("http://{}", addr)
}

fn fill_form(session: &RegistrationSession) {
    session.update_form(|form| {
        form.set_text("fullName", "Jane Doe");
        form.set_text("email", "jane@example.com");
        form.set_text("dob", "1988-02-29");
        form.set_number("experience", 12.0);
        form.set_text("currentProfession", "Surgeon");
        form.toggle_option("trainingPrograms", "Surgeon Training", true);
        form.toggle_option("trainingPrograms", "Animal Lab Training", true);
        form.toggle_option("additionalPrograms", "Cadaver Lab Training", true);
        form.set_terms(true);
    });
}

#[tokio::test]
async fn test_health_check() {
    let (base_url, _service) = start_service().await;
    let client = RegistrationClient::new(base_url);

    assert!(client.health_check().await.unwrap());
}

#[tokio::test]
async fn test_successful_submission_clears_form() {
    let (base_url, service) = start_service().await;
    let session = RegistrationSession::new(RegistrationClient::new(base_url));
    fill_form(&session);
    session.update_form(|form| {
        form.set_file(
            "uploadId",
            NewAttachment {
                filename: "licence.jpg".to_string(),
                content_type: Some("image/jpeg".to_string()),
                bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10],
            },
        )
    });

    let outcome = session.submit().await;

    assert_eq!(outcome, SubmitOutcome::Registered { ticket_no: 211550 });
    assert_eq!(
        session.state(),
        SubmissionState::Succeeded { ticket_no: 211550 }
    );
    assert!(session.form().is_empty());
    assert!(session.notice().is_none());

    let stored = service
        .registrations()
        .get_by_ticket(211550)
        .await
        .unwrap()
        .expect("Registration not persisted");
    assert_eq!(
        stored.fields.training_programs,
        vec!["Surgeon Training", "Animal Lab Training"]
    );
    assert_eq!(stored.fields.additional_programs, vec!["Cadaver Lab Training"]);
    assert_eq!(stored.fields.experience.as_deref(), Some("12"));
    assert_eq!(stored.upload_name.as_deref(), Some("licence.jpg"));

    let upload = service
        .attachments()
        .get(stored.upload_id.expect("upload id missing"))
        .await
        .unwrap()
        .expect("attachment not stored");
    assert_eq!(upload.bytes, vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
}

#[tokio::test]
async fn test_terms_gate_never_reaches_service() {
    let (base_url, service) = start_service().await;
    let session = RegistrationSession::new(RegistrationClient::new(base_url));
    fill_form(&session);
    session.update_form(|form| form.set_terms(false));

    assert!(!session.can_submit());
    assert_eq!(session.submit().await, SubmitOutcome::TermsNotAgreed);

    assert_eq!(service.counter().current().await.unwrap(), None);
    assert_eq!(service.registrations().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_rejected_submission_keeps_form() {
    let (base_url, service) = start_service().await;
    let session = RegistrationSession::new(RegistrationClient::new(base_url));
    session.update_form(|form| {
        form.set_text("fullName", "Jane Doe");
        form.set_terms(true);
    });

    let outcome = session.submit().await;

    assert_eq!(
        outcome,
        SubmitOutcome::Failed {
            message: "Registration Failed: Full Name and Email are required".to_string()
        }
    );
    assert_eq!(session.state(), SubmissionState::Failed);
    assert_eq!(
        session.notice().as_deref(),
        Some("Registration Failed: Full Name and Email are required")
    );
    assert!(session.form().get("fullName").is_some());
    assert!(session.can_submit());
    assert_eq!(service.counter().current().await.unwrap(), None);
}

#[tokio::test]
async fn test_transport_failure_reports_error_detail() {
    let session = RegistrationSession::new(RegistrationClient::new(unreachable_url().await));
    fill_form(&session);

    let SubmitOutcome::Failed { message } = session.submit().await else {
        panic!("expected a failed submission");
    };

    assert!(message.starts_with("Error submitting form: "));
    assert!(message.len() > "Error submitting form: ".len());
    assert_eq!(session.state(), SubmissionState::Failed);
    assert!(!session.form().is_empty());
}

#[tokio::test]
async fn test_consecutive_sessions_get_increasing_tickets() {
    let (base_url, _service) = start_service().await;

    let mut tickets = Vec::new();
    for _ in 0..3 {
        let session = RegistrationSession::new(RegistrationClient::new(base_url.clone()));
        fill_form(&session);
        match session.submit().await {
            SubmitOutcome::Registered { ticket_no } => tickets.push(ticket_no),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    assert_eq!(tickets, vec![211550, 211551, 211552]);
}

#[tokio::test]
async fn test_rejection_notice_clears_after_five_seconds() {
    let (base_url, _service) = start_service().await;
    let session = RegistrationSession::new(RegistrationClient::new(base_url));
    session.update_form(|form| {
        form.set_text("fullName", "Jane Doe");
        form.set_terms(true);
    });

    assert!(matches!(session.submit().await, SubmitOutcome::Failed { .. }));
    tokio::time::pause();

    tokio::time::advance(Duration::from_secs(4)).await;
    assert_eq!(
        session.notice().as_deref(),
        Some("Registration Failed: Full Name and Email are required")
    );

    tokio::time::advance(Duration::from_millis(1100)).await;
    assert!(session.notice().is_none());
    assert_eq!(session.state(), SubmissionState::Failed);
    assert!(session.form().get("fullName").is_some());
}

#[tokio::test]
async fn test_transport_error_notice_clears_after_five_seconds() {
    let session = RegistrationSession::new(RegistrationClient::new(unreachable_url().await));
    fill_form(&session);

    assert!(matches!(session.submit().await, SubmitOutcome::Failed { .. }));
    tokio::time::pause();

    tokio::time::advance(Duration::from_secs(4)).await;
    let notice = session.notice().expect("notice cleared too early");
    assert!(notice.starts_with("Error submitting form: "));

    tokio::time::advance(Duration::from_millis(1100)).await;
    assert!(session.notice().is_none());
    assert!(!session.form().is_empty());
}

#[tokio::test]
async fn test_second_submit_is_refused_while_first_is_in_flight() {
    let release = Arc::new(Notify::new());
    let app = {
        let release = release.clone();
        Router::new().route(
            "/api/register",
            post(move |_body: Bytes| {
                let release = release.clone();
                async move {
                    release.notified().await;
                    Json(json!({ "success": true, "ticketNo": 211550 }))
                }
            }),
        )
    };

    let session = Arc::new(RegistrationSession::new(RegistrationClient::new(
        serve(app).await,
    )));
    fill_form(&session);

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    while session.state() != SubmissionState::Submitting {
        tokio::task::yield_now().await;
    }

    assert!(!session.can_submit());
    assert_eq!(session.submit().await, SubmitOutcome::Busy);
    assert_eq!(session.state(), SubmissionState::Submitting);

    release.notify_one();
    assert_eq!(
        first.await.unwrap(),
        SubmitOutcome::Registered { ticket_no: 211550 }
    );
    assert_eq!(
        session.state(),
        SubmissionState::Succeeded { ticket_no: 211550 }
    );
}

#[tokio::test]
async fn test_unparseable_response_reports_body() {
    let app = Router::new().route(
        "/api/register",
        post(|_body: Bytes| async { (StatusCode::BAD_GATEWAY, "upstream connect error") }),
    );
    let session = RegistrationSession::new(RegistrationClient::new(serve(app).await));
    fill_form(&session);

    let SubmitOutcome::Failed { message } = session.submit().await else {
        panic!("expected a failed submission");
    };

    assert!(message.starts_with("Error submitting form: "));
    assert!(message.contains("502"));
    assert!(message.contains("upstream connect error"));
}

//! Submission lifecycle: idle → submitting → succeeded / failed

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use enrollment_common::RegisterResponse;

use crate::client::RegistrationClient;
use crate::form::RegistrationForm;

/// How long an error notice stays visible
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

pub const TERMS_NOT_AGREED: &str = "Please agree to the Terms and Conditions.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded { ticket_no: u64 },
    Failed,
}

/// Result of one call to [`RegistrationSession::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Registered { ticket_no: u64 },
    /// Terms were not agreed; nothing was sent
    TermsNotAgreed,
    /// Another submission is still in flight; nothing was sent
    Busy,
    Failed { message: String },
}

#[derive(Debug)]
struct Notice {
    text: String,
    shown_at: Instant,
}

#[derive(Debug)]
struct SessionInner {
    form: RegistrationForm,
    state: SubmissionState,
    notice: Option<Notice>,
}

/// One applicant's form and its submission state
pub struct RegistrationSession {
    client: RegistrationClient,
    inner: Mutex<SessionInner>,
}

impl RegistrationSession {
    pub fn new(client: RegistrationClient) -> Self {
        Self {
            client,
            inner: Mutex::new(SessionInner {
                form: RegistrationForm::new(),
                state: SubmissionState::Idle,
                notice: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Edit the form in place
    pub fn update_form<R>(&self, edit: impl FnOnce(&mut RegistrationForm) -> R) -> R {
        edit(&mut self.lock().form)
    }

    pub fn form(&self) -> RegistrationForm {
        self.lock().form.clone()
    }

    pub fn state(&self) -> SubmissionState {
        self.lock().state
    }

    /// The submit control is enabled only when the terms are agreed and no
    /// submission is in flight
    pub fn can_submit(&self) -> bool {
        let inner = self.lock();
        inner.state != SubmissionState::Submitting && inner.form.terms_agreed()
    }

    /// The current error notice, if it has not expired yet
    pub fn notice(&self) -> Option<String> {
        self.lock()
            .notice
            .as_ref()
            .filter(|notice| notice.shown_at.elapsed() < NOTICE_TTL)
            .map(|notice| notice.text.clone())
    }

    /// Submit the current form.
    ///
    /// On success the form is cleared; on failure it is kept and an error
    /// notice is shown for [`NOTICE_TTL`].
    pub async fn submit(&self) -> SubmitOutcome {
        let parts = {
            let mut inner = self.lock();
            if inner.state == SubmissionState::Submitting {
                return SubmitOutcome::Busy;
            }
            if !inner.form.terms_agreed() {
                show_notice(&mut inner, TERMS_NOT_AGREED.to_string());
                return SubmitOutcome::TermsNotAgreed;
            }

            inner.state = SubmissionState::Submitting;
            inner.notice = None;
            inner.form.payload()
        };

        // Dropped after the state below is settled, or early if this
        // future is abandoned.
        let _in_flight = InFlight { session: self };
        let result = self.client.submit(parts).await;

        let mut inner = self.lock();
        match result {
            Ok(RegisterResponse {
                success: true,
                ticket_no: Some(ticket_no),
                ..
            }) => {
                info!("Registration accepted with ticket {}", ticket_no);
                inner.state = SubmissionState::Succeeded { ticket_no };
                inner.form.clear();
                SubmitOutcome::Registered { ticket_no }
            }
            Ok(response) => {
                let message = format!(
                    "Registration Failed: {}",
                    response.error.as_deref().unwrap_or("Unknown error")
                );
                warn!("{}", message);
                inner.state = SubmissionState::Failed;
                show_notice(&mut inner, message.clone());
                SubmitOutcome::Failed { message }
            }
            Err(e) => {
                let message = format!("Error submitting form: {:#}", e);
                warn!("{}", message);
                inner.state = SubmissionState::Failed;
                show_notice(&mut inner, message.clone());
                SubmitOutcome::Failed { message }
            }
        }
    }
}

fn show_notice(inner: &mut SessionInner, text: String) {
    inner.notice = Some(Notice {
        text,
        shown_at: Instant::now(),
    });
}

/// Returns the session to idle if a submission is abandoned mid-flight
struct InFlight<'a> {
    session: &'a RegistrationSession,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.lock();
        if inner.state == SubmissionState::Submitting {
            inner.state = SubmissionState::Idle;
        }
    }
}

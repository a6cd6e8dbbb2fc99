//! Submission Client
//!
//! Holds the registration form state on the applicant's side, enforces the
//! terms gate and single in-flight submission, and sends the form to the
//! Registration Service as one multipart request.

pub mod client;
pub mod form;
pub mod session;

pub use client::RegistrationClient;
pub use form::{FormValue, PayloadPart, RegistrationForm};
pub use session::{RegistrationSession, SubmissionState, SubmitOutcome, NOTICE_TTL};

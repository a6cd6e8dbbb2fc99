pub mod error;
pub mod fields;
pub mod models;

pub use error::{Error, Result};
pub use fields::RegistrationFields;
pub use models::{
    AttachmentMeta, AttachmentRef, NewAttachment, Registration, RegistrationStatus,
    RegisterResponse, DEFAULT_TICKET_FLOOR, TICKET_COUNTER_ID,
};

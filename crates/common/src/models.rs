//! Persisted entities and wire shapes shared by the service and the client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fields::RegistrationFields;

/// Fixed identifier of the single ticket counter row
pub const TICKET_COUNTER_ID: &str = "ticketNo";

/// Lowest ticket number ever issued
pub const DEFAULT_TICKET_FLOOR: u64 = 211_550;

/// Review state of a registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Upcoming,
    #[default]
    Pending,
    Completed,
}

/// Link from a registration to its stored identification document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: Uuid,
    pub filename: String,
}

/// An uploaded document that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    /// Original file name as sent by the browser
    pub filename: String,

    /// Declared MIME type of the part, if any
    pub content_type: Option<String>,

    pub bytes: Vec<u8>,
}

/// Metadata kept next to every stored blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMeta {
    pub id: Uuid,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub length: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// One accepted applicant submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Record id assigned by the persistence layer
    pub id: Uuid,

    /// Sequentially allocated ticket number
    pub ticket_no: u64,

    #[serde(flatten)]
    pub fields: RegistrationFields,

    /// Id of the stored identification document
    pub upload_id: Option<Uuid>,

    /// Original file name of the stored identification document
    pub upload_name: Option<String>,

    #[serde(default)]
    pub status: RegistrationStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// Build a new pending registration for an allocated ticket
    pub fn new(
        ticket_no: u64,
        fields: RegistrationFields,
        attachment: Option<AttachmentRef>,
    ) -> Self {
        let now = Utc::now();
        let (upload_id, upload_name) = match attachment {
            Some(a) => (Some(a.id), Some(a.filename)),
            None => (None, None),
        };

        Self {
            id: Uuid::new_v4(),
            ticket_no,
            fields,
            upload_id,
            upload_name,
            status: RegistrationStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The attachment reference, if a document was uploaded
    pub fn attachment(&self) -> Option<AttachmentRef> {
        match (self.upload_id, &self.upload_name) {
            (Some(id), Some(filename)) => Some(AttachmentRef {
                id,
                filename: filename.clone(),
            }),
            _ => None,
        }
    }
}

/// Body returned by `POST /api/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_no: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Registration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegisterResponse {
    pub fn accepted(registration: Registration) -> Self {
        Self {
            success: true,
            ticket_no: Some(registration.ticket_no),
            data: Some(registration),
            error: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ticket_no: None,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields() -> RegistrationFields {
        RegistrationFields::new("Jane Doe", "jane@example.com")
    }

    #[test]
    fn test_new_registration_is_pending() {
        let registration = Registration::new(211550, fields(), None);

        assert_eq!(registration.status, RegistrationStatus::Pending);
        assert_eq!(registration.created_at, registration.updated_at);
        assert!(registration.attachment().is_none());
    }

    #[test]
    fn test_registration_wire_shape() {
        let registration = Registration::new(211551, fields(), None);
        let value = serde_json::to_value(&registration).unwrap();

        assert_eq!(value["ticketNo"], 211551);
        assert_eq!(value["fullName"], "Jane Doe");
        assert_eq!(value["email"], "jane@example.com");
        assert_eq!(value["status"], "pending");
        assert!(value["uploadId"].is_null());
        assert!(value["uploadName"].is_null());
        assert_eq!(value["trainingPrograms"], json!([]));
    }

    #[test]
    fn test_attachment_reference_roundtrips_through_record() {
        let attachment = AttachmentRef {
            id: Uuid::new_v4(),
            filename: "passport.pdf".to_string(),
        };
        let registration = Registration::new(211552, fields(), Some(attachment.clone()));

        let json = serde_json::to_string(&registration).unwrap();
        let decoded: Registration = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.attachment(), Some(attachment));
        assert_eq!(decoded, registration);
    }

    #[test]
    fn test_rejected_response_omits_ticket() {
        let value = serde_json::to_value(RegisterResponse::rejected("Unsupported Content-Type"))
            .unwrap();

        assert_eq!(value, json!({ "success": false, "error": "Unsupported Content-Type" }));
    }
}

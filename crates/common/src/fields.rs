//! Applicant fields and their normalization from either request encoding
//!
//! Both the JSON and the multipart paths funnel every value through the same
//! rules: text is trimmed and blank text is treated as absent, multi-valued
//! program choices are split on `|` into an ordered set, and the terms flag
//! only counts as agreed for a small set of truthy tokens.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Separator used to pack a multi-valued field into one string
pub const MULTI_VALUE_DELIMITER: char = '|';

pub const FULL_NAME: &str = "fullName";
pub const EMAIL: &str = "email";
pub const PHONE_NUMBER: &str = "phoneNumber";
pub const DOB: &str = "dob";
pub const EXPERIENCE: &str = "experience";
pub const INSTITUTION: &str = "institution";
pub const CALL_DATE_TIME: &str = "callDateTime";
pub const HEAR_ABOUT_US: &str = "hearAboutUs";
pub const CURRENT_PROFESSION: &str = "currentProfession";
pub const SPECIALIZATION: &str = "specialization";
pub const LEARNING_GOALS: &str = "learningGoals";
pub const TRAINING_PROGRAMS: &str = "trainingPrograms";
pub const ADDITIONAL_PROGRAMS: &str = "additionalPrograms";
pub const TERMS_AGREE: &str = "termsAgree";
pub const UPLOAD: &str = "uploadId";

/// Normalized applicant details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFields {
    pub full_name: String,
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Date of birth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,

    /// Years of experience, kept as entered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,

    /// Preferred call date/time, kept as entered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_date_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hear_about_us: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_profession: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_goals: Option<String>,

    #[serde(default)]
    pub training_programs: Vec<String>,

    #[serde(default)]
    pub additional_programs: Vec<String>,

    #[serde(default)]
    pub terms_agree: bool,
}

impl RegistrationFields {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Normalize a structured (JSON) submission.
    ///
    /// Unknown keys are ignored. Multi-valued fields may be a `|`-joined
    /// string or an array of strings.
    pub fn from_json(body: Value) -> Result<Self> {
        let Value::Object(map) = body else {
            return Err(Error::MalformedBody("expected a JSON object".to_string()));
        };

        let mut fields = Self::default();
        for (key, value) in map {
            match key.as_str() {
                TRAINING_PROGRAMS | ADDITIONAL_PROGRAMS => {
                    for entry in json_multi_values(&key, value)? {
                        fields.push_multi(&key, &entry);
                    }
                }
                TERMS_AGREE => {
                    fields.terms_agree = match value {
                        Value::Bool(b) => b,
                        Value::String(s) => is_truthy_token(&s),
                        _ => false,
                    };
                }
                name if is_text_field(name) => {
                    if let Some(text) = json_text(&key, value)? {
                        fields.set_text(&key, &text)?;
                    }
                }
                _ => {}
            }
        }

        Ok(fields)
    }

    /// Apply one text part of a multipart submission.
    ///
    /// Repeated multi-valued parts accumulate; for single-valued fields the
    /// first non-blank occurrence wins.
    pub fn apply_form_value(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            TRAINING_PROGRAMS | ADDITIONAL_PROGRAMS => {
                self.push_multi(name, value);
                Ok(())
            }
            TERMS_AGREE => {
                self.terms_agree = is_truthy_token(value);
                Ok(())
            }
            _ => {
                if self.has_text(name) {
                    return Ok(());
                }
                self.set_text(name, value)
            }
        }
    }

    /// Check the fields every registration must carry
    pub fn validate(&self) -> Result<()> {
        if self.full_name.trim().is_empty() || self.email.trim().is_empty() {
            return Err(Error::MissingRequiredFields);
        }
        Ok(())
    }

    fn has_text(&mut self, name: &str) -> bool {
        match name {
            FULL_NAME => !self.full_name.is_empty(),
            EMAIL => !self.email.is_empty(),
            DOB => self.dob.is_some(),
            _ => self.text_slot(name).is_some_and(|slot| slot.is_some()),
        }
    }

    fn set_text(&mut self, name: &str, raw: &str) -> Result<()> {
        let value = raw.trim();
        if value.is_empty() {
            return Ok(());
        }

        match name {
            FULL_NAME => self.full_name = value.to_string(),
            EMAIL => self.email = value.to_string(),
            DOB => self.dob = Some(parse_date(value)?),
            _ => {
                if let Some(slot) = self.text_slot(name) {
                    *slot = Some(value.to_string());
                }
            }
        }
        Ok(())
    }

    fn text_slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        let slot = match name {
            PHONE_NUMBER => &mut self.phone_number,
            EXPERIENCE => &mut self.experience,
            INSTITUTION => &mut self.institution,
            CALL_DATE_TIME => &mut self.call_date_time,
            HEAR_ABOUT_US => &mut self.hear_about_us,
            CURRENT_PROFESSION => &mut self.current_profession,
            SPECIALIZATION => &mut self.specialization,
            LEARNING_GOALS => &mut self.learning_goals,
            _ => return None,
        };
        Some(slot)
    }

    fn push_multi(&mut self, name: &str, raw: &str) {
        let list = match name {
            TRAINING_PROGRAMS => &mut self.training_programs,
            ADDITIONAL_PROGRAMS => &mut self.additional_programs,
            _ => return,
        };
        for entry in split_multi_value(raw) {
            if !list.contains(&entry) {
                list.push(entry);
            }
        }
    }
}

/// Split a `|`-joined value into its non-blank members, in order
pub fn split_multi_value(raw: &str) -> Vec<String> {
    raw.split(MULTI_VALUE_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Checkbox tokens that count as agreement
pub fn is_truthy_token(raw: &str) -> bool {
    matches!(raw, "on" | "true")
}

/// Parse a date as sent by a date input (`YYYY-MM-DD`) or as an RFC 3339
/// timestamp, keeping only the calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|e| Error::InvalidField {
            field: DOB,
            reason: e.to_string(),
        })
}

fn is_text_field(name: &str) -> bool {
    matches!(
        name,
        FULL_NAME
            | EMAIL
            | PHONE_NUMBER
            | DOB
            | EXPERIENCE
            | INSTITUTION
            | CALL_DATE_TIME
            | HEAR_ABOUT_US
            | CURRENT_PROFESSION
            | SPECIALIZATION
            | LEARNING_GOALS
    )
}

fn json_text(key: &str, value: Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        _ => Err(Error::MalformedBody(format!("{} must be a string", key))),
    }
}

fn json_multi_values(key: &str, value: Value) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(Error::MalformedBody(format!(
                    "{} must contain only strings",
                    key
                ))),
            })
            .collect(),
        _ => Err(Error::MalformedBody(format!(
            "{} must be a string or a list of strings",
            key
        ))),
    }
}

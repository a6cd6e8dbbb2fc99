//! Form field state and the outbound payload built from it

use enrollment_common::fields::{MULTI_VALUE_DELIMITER, TERMS_AGREE};
use enrollment_common::NewAttachment;
use std::collections::BTreeMap;

/// Value held by one form field
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    Number(f64),
    Bool(bool),
    File(NewAttachment),
    /// Selected options of a checkbox group, in selection order
    List(Vec<String>),
    Null,
}

/// One part of the outbound multipart request
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadPart {
    Text { name: String, value: String },
    File { name: String, attachment: NewAttachment },
}

impl PayloadPart {
    pub fn name(&self) -> &str {
        match self {
            PayloadPart::Text { name, .. } | PayloadPart::File { name, .. } => name,
        }
    }
}

/// Registration form state keyed by field name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationForm {
    values: BTreeMap<String, FormValue>,
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: FormValue) {
        self.values.insert(key.into(), value);
    }

    pub fn set_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, FormValue::Text(value.into()));
    }

    pub fn set_number(&mut self, key: impl Into<String>, value: f64) {
        self.set(key, FormValue::Number(value));
    }

    pub fn set_file(&mut self, key: impl Into<String>, attachment: NewAttachment) {
        self.set(key, FormValue::File(attachment));
    }

    /// Check or uncheck one option of a checkbox group
    pub fn toggle_option(&mut self, key: &str, option: &str, checked: bool) {
        let entry = self
            .values
            .entry(key.to_string())
            .or_insert_with(|| FormValue::List(Vec::new()));
        if !matches!(entry, FormValue::List(_)) {
            *entry = FormValue::List(Vec::new());
        }
        let FormValue::List(options) = entry else {
            return;
        };

        if checked {
            if !options.iter().any(|o| o == option) {
                options.push(option.to_string());
            }
        } else {
            options.retain(|o| o != option);
        }
    }

    pub fn set_terms(&mut self, agreed: bool) {
        self.set(TERMS_AGREE, FormValue::Bool(agreed));
    }

    pub fn terms_agreed(&self) -> bool {
        matches!(self.values.get(TERMS_AGREE), Some(FormValue::Bool(true)))
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build the outbound parts.
    ///
    /// The terms flag is not sent. Checkbox groups are joined with `|`
    /// into a single text part and nulls are skipped.
    pub fn payload(&self) -> Vec<PayloadPart> {
        self.values
            .iter()
            .filter(|(key, _)| key.as_str() != TERMS_AGREE)
            .filter_map(|(key, value)| {
                let name = key.clone();
                let text = match value {
                    FormValue::Text(s) => s.clone(),
                    FormValue::Number(n) => n.to_string(),
                    FormValue::Bool(b) => b.to_string(),
                    FormValue::List(options) => {
                        options.join(MULTI_VALUE_DELIMITER.to_string().as_str())
                    }
                    FormValue::File(attachment) => {
                        return Some(PayloadPart::File {
                            name,
                            attachment: attachment.clone(),
                        })
                    }
                    FormValue::Null => return None,
                };
                Some(PayloadPart::Text { name, value: text })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_part<'a>(parts: &'a [PayloadPart], name: &str) -> Option<&'a str> {
        parts.iter().find_map(|part| match part {
            PayloadPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    #[test]
    fn test_toggle_accumulates_and_removes_options() {
        let mut form = RegistrationForm::new();
        form.toggle_option("trainingPrograms", "Surgeon Training", true);
        form.toggle_option("trainingPrograms", "Animal Lab Training", true);
        form.toggle_option("trainingPrograms", "Surgeon Training", true);

        assert_eq!(
            form.get("trainingPrograms"),
            Some(&FormValue::List(vec![
                "Surgeon Training".to_string(),
                "Animal Lab Training".to_string()
            ]))
        );

        form.toggle_option("trainingPrograms", "Surgeon Training", false);
        assert_eq!(
            form.get("trainingPrograms"),
            Some(&FormValue::List(vec!["Animal Lab Training".to_string()]))
        );
    }

    #[test]
    fn test_payload_joins_lists_and_skips_terms() {
        let mut form = RegistrationForm::new();
        form.set_text("fullName", "Jane Doe");
        form.set_number("experience", 7.0);
        form.set("institution", FormValue::Null);
        form.set_terms(true);
        form.toggle_option("trainingPrograms", "Surgeon Training", true);
        form.toggle_option("trainingPrograms", "Animal Lab Training", true);

        let parts = form.payload();

        assert_eq!(text_part(&parts, "fullName"), Some("Jane Doe"));
        assert_eq!(text_part(&parts, "experience"), Some("7"));
        assert_eq!(
            text_part(&parts, "trainingPrograms"),
            Some("Surgeon Training|Animal Lab Training")
        );
        assert!(parts.iter().all(|p| p.name() != "termsAgree"));
        assert!(parts.iter().all(|p| p.name() != "institution"));
    }

    #[test]
    fn test_payload_attaches_file_under_its_key() {
        let mut form = RegistrationForm::new();
        let scan = NewAttachment {
            filename: "passport.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: b"%PDF-1.7".to_vec(),
        };
        form.set_file("uploadId", scan.clone());

        assert_eq!(
            form.payload(),
            vec![PayloadPart::File {
                name: "uploadId".to_string(),
                attachment: scan
            }]
        );
    }

    #[test]
    fn test_terms_flag() {
        let mut form = RegistrationForm::new();
        assert!(!form.terms_agreed());

        form.set_terms(true);
        assert!(form.terms_agreed());

        form.set_text("termsAgree", "true");
        assert!(!form.terms_agreed());
    }
}

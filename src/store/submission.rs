//! Parsing and validation of `/save` payloads.

use serde_json::{Map, Value};

use super::error::ValidationError;
use super::kind::RecordKind;
use super::row::render_value;

const MAX_PARTICIPANT_ID_LEN: usize = 128;

/// A validated save request.
#[derive(Debug, Clone)]
pub struct Submission {
    participant_id: String,
    data_type: String,
    data: Map<String, Value>,
    raw: Value,
}

impl Submission {
    /// Parse a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(body).map_err(ValidationError::MalformedBody)?;
        Self::from_value(value)
    }

    /// Validate a decoded request body.
    ///
    /// Absent, `null`, `false`, `0` and `""` all count as missing. Presence of
    /// all three top-level fields is checked before their shapes.
    pub fn from_value(raw: Value) -> Result<Self, ValidationError> {
        let Some(body) = raw.as_object() else {
            return Err(ValidationError::MissingFields);
        };

        let participant_id = present(body, "participant_id");
        let data_type = present(body, "data_type");
        let data = present(body, "data");
        let (Some(participant_id), Some(data_type), Some(data)) = (participant_id, data_type, data)
        else {
            return Err(ValidationError::MissingFields);
        };

        let participant_id = participant_id_text(participant_id)?;
        let data_type = data_type
            .as_str()
            .ok_or(ValidationError::InvalidDataType)?
            .to_string();
        let data = data
            .as_object()
            .ok_or(ValidationError::InvalidData)?
            .clone();

        Ok(Self {
            participant_id,
            data_type,
            data,
            raw,
        })
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Participant id checked for use inside a file name.
    ///
    /// Only ASCII letters, digits, `-`, `_` and `.` are allowed. Records that
    /// never name a per-participant file do not need this.
    pub fn file_safe_participant_id(&self) -> Result<&str, ValidationError> {
        let id = self.participant_id.as_str();
        let valid = id.len() <= MAX_PARTICIPANT_ID_LEN
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(id)
        } else {
            Err(ValidationError::InvalidParticipantId)
        }
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    /// Known kind for this submission, if any.
    pub fn kind(&self) -> Option<RecordKind> {
        RecordKind::parse(&self.data_type)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// The full request body as received.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

fn present<'a>(body: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    body.get(key).filter(|value| is_truthy(value))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn participant_id_text(value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(_) => Ok(render_value(value)),
        _ => Err(ValidationError::InvalidParticipantId),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_submission() {
        let sub = Submission::from_value(json!({
            "participant_id": "42",
            "data_type": "trial",
            "data": {"age": 5}
        }))
        .unwrap();

        assert_eq!(sub.participant_id(), "42");
        assert_eq!(sub.kind(), Some(RecordKind::Trial));
        assert_eq!(sub.data().get("age"), Some(&json!(5)));
    }

    #[test]
    fn test_numeric_participant_id() {
        let sub = Submission::from_value(json!({
            "participant_id": 17,
            "data_type": "scenario",
            "data": {}
        }))
        .unwrap();
        assert_eq!(sub.participant_id(), "17");
    }

    #[test]
    fn test_missing_fields() {
        let cases = [
            json!({"data_type": "trial", "data": {}}),
            json!({"participant_id": "1", "data": {}}),
            json!({"participant_id": "1", "data_type": "trial"}),
            json!({"participant_id": "", "data_type": "trial", "data": {}}),
            json!({"participant_id": 0, "data_type": "trial", "data": {}}),
            json!({"participant_id": "1", "data_type": null, "data": {}}),
            json!([1, 2, 3]),
            json!("text"),
        ];
        for case in cases {
            assert!(
                matches!(
                    Submission::from_value(case.clone()),
                    Err(ValidationError::MissingFields)
                ),
                "expected MissingFields for {case}"
            );
        }
    }

    #[test]
    fn test_empty_data_object_is_accepted() {
        let sub = Submission::from_value(json!({
            "participant_id": "42",
            "data_type": "completion",
            "data": {}
        }))
        .unwrap();
        assert!(sub.data().is_empty());
    }

    #[test]
    fn test_file_safe_participant_id() {
        for bad in ["../etc", "a/b", "a\\b", "a b", "ü", "sub01@lab"] {
            let sub = Submission::from_value(json!({
                "participant_id": bad,
                "data_type": "trial",
                "data": {}
            }))
            .unwrap();
            assert!(
                matches!(
                    sub.file_safe_participant_id(),
                    Err(ValidationError::InvalidParticipantId)
                ),
                "expected rejection for {bad:?}"
            );
        }

        let long = Submission::from_value(json!({
            "participant_id": "x".repeat(MAX_PARTICIPANT_ID_LEN + 1),
            "data_type": "trial",
            "data": {}
        }))
        .unwrap();
        assert!(long.file_safe_participant_id().is_err());

        let ok = Submission::from_value(json!({
            "participant_id": "P-01_a.b",
            "data_type": "trial",
            "data": {}
        }))
        .unwrap();
        assert_eq!(ok.file_safe_participant_id().unwrap(), "P-01_a.b");
    }

    #[test]
    fn test_free_form_participant_id_accepted_for_completion() {
        let sub = Submission::from_value(json!({
            "participant_id": "P 01",
            "data_type": "completion",
            "data": {"done": true}
        }))
        .unwrap();
        assert_eq!(sub.participant_id(), "P 01");
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(
            Submission::from_value(json!({"participant_id": "1", "data_type": 3, "data": {}})),
            Err(ValidationError::InvalidDataType)
        ));
        assert!(matches!(
            Submission::from_value(json!({"participant_id": "1", "data_type": "trial", "data": "x"})),
            Err(ValidationError::InvalidData)
        ));
        assert!(matches!(
            Submission::from_value(json!({"participant_id": true, "data_type": "trial", "data": {}})),
            Err(ValidationError::InvalidParticipantId)
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Submission::from_slice(b"{not json"),
            Err(ValidationError::MalformedBody(_))
        ));
    }
}

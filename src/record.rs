use serde::{Deserialize, Serialize};

/// The record carried by the pipeline, matching `cardspending.avsc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardSpending {
    pub id: i32,
    pub message: String,
}

impl CardSpending {
    /// The `n`th generated record.
    pub fn numbered(id: i32) -> Self {
        Self {
            id,
            message: format!("MsgNo. {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_record() {
        let record = CardSpending::numbered(3);
        assert_eq!(record.id, 3);
        assert_eq!(record.message, "MsgNo. 3");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let parsed: Result<CardSpending, _> =
            serde_json::from_str(r#"{"id": 1, "message": "x", "amount": 2}"#);
        assert!(parsed.is_err());
    }
}

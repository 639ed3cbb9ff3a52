//! Message model and the `sender|recipient|content` wire codec.
//!
//! The wire form is a flat triple split on the first two delimiters; the
//! content is whatever follows the second one and may itself contain `|`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field delimiter of the encoded form.
pub const DELIMITER: char = '|';

/// Maximum length of a participant identifier, in characters.
pub const MAX_PARTICIPANT_LEN: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected sender|recipient|content, found {found} field(s)")]
    MissingFields { found: usize },

    #[error("{field} is empty")]
    EmptyParticipant { field: &'static str },

    #[error("{field} exceeds {max} characters", max = MAX_PARTICIPANT_LEN)]
    ParticipantTooLong { field: &'static str },

    #[error("{field} contains the '{delim}' delimiter", delim = DELIMITER)]
    DelimiterInParticipant { field: &'static str },
}

/// A decoded, not yet persisted message.
///
/// Keeps the exact wire string it was decoded from so fan-out can forward
/// the original bytes instead of a re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sender: String,
    pub recipient: String,
    pub content: String,
    raw: String,
}

impl Envelope {
    /// The original wire string.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Stamp the envelope, yielding the message to store and the original
    /// wire string to forward.
    pub fn stamp(self, timestamp: DateTime<Utc>) -> (Message, String) {
        let message = Message {
            sender: self.sender,
            recipient: self.recipient,
            content: self.content,
            timestamp,
        };
        (message, self.raw)
    }
}

/// A durably recorded message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "from")]
    pub sender: String,
    #[serde(rename = "to")]
    pub recipient: String,
    pub content: String,
    /// Assigned when the message was persisted.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Whether `user` is one of the two participants.
    pub fn involves(&self, user: &str) -> bool {
        self.sender == user || self.recipient == user
    }
}

/// Parse an encoded message.
pub fn decode(raw: &str) -> Result<Envelope, DecodeError> {
    let parts: Vec<&str> = raw.splitn(3, DELIMITER).collect();
    let [sender, recipient, content] = parts.as_slice() else {
        return Err(DecodeError::MissingFields { found: parts.len() });
    };

    check_participant("sender", sender)?;
    check_participant("recipient", recipient)?;

    Ok(Envelope {
        sender: sender.to_string(),
        recipient: recipient.to_string(),
        content: content.to_string(),
        raw: raw.to_string(),
    })
}

/// Join the three fields into the wire form.
pub fn encode(sender: &str, recipient: &str, content: &str) -> String {
    format!("{sender}{DELIMITER}{recipient}{DELIMITER}{content}")
}

/// Encode for a producer, refusing anything that would not decode back to
/// the same sender and recipient.
pub fn encode_checked(sender: &str, recipient: &str, content: &str) -> Result<String, DecodeError> {
    for (field, value) in [("sender", sender), ("recipient", recipient)] {
        if value.contains(DELIMITER) {
            return Err(DecodeError::DelimiterInParticipant { field });
        }
        check_participant(field, value)?;
    }
    Ok(encode(sender, recipient, content))
}

fn check_participant(field: &'static str, value: &str) -> Result<(), DecodeError> {
    if value.is_empty() {
        return Err(DecodeError::EmptyParticipant { field });
    }
    if value.chars().count() > MAX_PARTICIPANT_LEN {
        return Err(DecodeError::ParticipantTooLong { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic() {
        let env = decode("alice|bob|hello").unwrap();

        assert_eq!(env.sender, "alice");
        assert_eq!(env.recipient, "bob");
        assert_eq!(env.content, "hello");
        assert_eq!(env.raw(), "alice|bob|hello");
    }

    #[test]
    fn test_decode_content_keeps_delimiters() {
        let env = decode("alice|bob|a|b||c").unwrap();

        assert_eq!(env.content, "a|b||c");
        assert_eq!(env.raw(), "alice|bob|a|b||c");
    }

    #[test]
    fn test_decode_empty_content() {
        let env = decode("alice|bob|").unwrap();
        assert_eq!(env.content, "");
    }

    #[test]
    fn test_decode_missing_fields() {
        assert_eq!(
            decode("onlytwoparts"),
            Err(DecodeError::MissingFields { found: 1 })
        );
        assert_eq!(
            decode("alice|bob"),
            Err(DecodeError::MissingFields { found: 2 })
        );
    }

    #[test]
    fn test_decode_rejects_empty_participants() {
        assert_eq!(
            decode("|bob|hi"),
            Err(DecodeError::EmptyParticipant { field: "sender" })
        );
        assert_eq!(
            decode("alice||hi"),
            Err(DecodeError::EmptyParticipant { field: "recipient" })
        );
    }

    #[test]
    fn test_decode_rejects_long_participants() {
        assert_eq!(
            decode("abcdefghijk|bob|hi"),
            Err(DecodeError::ParticipantTooLong { field: "sender" })
        );
        // Exactly at the limit is fine.
        assert!(decode("abcdefghij|bob|hi").is_ok());
    }

    #[test]
    fn test_encode_decode() {
        let raw = encode("A", "B", "see you at 5");
        assert_eq!(raw, "A|B|see you at 5");

        let env = decode(&raw).unwrap();
        assert_eq!(
            (env.sender.as_str(), env.recipient.as_str(), env.content.as_str()),
            ("A", "B", "see you at 5")
        );
    }

    #[test]
    fn test_encode_checked() {
        assert_eq!(encode_checked("A", "B", "x|y").unwrap(), "A|B|x|y");

        // Would otherwise decode as a|b with content "c|hi".
        assert_eq!(
            encode_checked("a|b", "c", "hi"),
            Err(DecodeError::DelimiterInParticipant { field: "sender" })
        );
        assert_eq!(
            encode_checked("a", "b|c", "hi"),
            Err(DecodeError::DelimiterInParticipant { field: "recipient" })
        );
        assert_eq!(
            encode_checked("", "b", "hi"),
            Err(DecodeError::EmptyParticipant { field: "sender" })
        );
        assert_eq!(
            encode_checked("a", "abcdefghijk", "hi"),
            Err(DecodeError::ParticipantTooLong { field: "recipient" })
        );
    }

    #[test]
    fn test_message_json_shape() {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let (msg, raw) = decode("alice|bob|hello").unwrap().stamp(ts);
        assert_eq!(raw, "alice|bob|hello");

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["from"], "alice");
        assert_eq!(json["to"], "bob");
        assert_eq!(json["content"], "hello");
        assert_eq!(json["timestamp"], "2024-05-01T10:00:00Z");
        assert!(msg.involves("bob"));
        assert!(!msg.involves("carol"));
    }
}

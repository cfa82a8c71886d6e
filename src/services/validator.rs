use serde_json::Value;
use thiserror::Error;

use crate::message::Message;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("request body is missing")]
    MissingBody,
    #[error("request body is not valid JSON")]
    MalformedJson,
    #[error("request body is missing the 'messages' list")]
    MissingMessages,
    #[error("'messages' must be a list")]
    MessagesNotAList,
    #[error("'messages' must contain at least one message")]
    EmptyMessages,
    #[error("messages[{index}] must be an object with string 'role' and 'content'")]
    InvalidMessage { index: usize },
}

/// Extract the ordered message list from a raw `/api/chat` body.
pub fn validate_chat_request(body: &[u8]) -> Result<Vec<Message>, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::MissingBody);
    }

    let payload: Value =
        serde_json::from_slice(body).map_err(|_| ValidationError::MalformedJson)?;

    let messages = match payload {
        Value::Null => return Err(ValidationError::MissingBody),
        Value::Object(mut fields) => fields
            .remove("messages")
            .ok_or(ValidationError::MissingMessages)?,
        _ => return Err(ValidationError::MissingMessages),
    };

    let Value::Array(items) = messages else {
        return Err(ValidationError::MessagesNotAList);
    };
    if items.is_empty() {
        return Err(ValidationError::EmptyMessages);
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|_| ValidationError::InvalidMessage { index })
        })
        .collect()
}

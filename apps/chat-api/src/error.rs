use thiserror::Error;

/// Failure reported by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel_async::pooled_connection::deadpool::PoolError),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("store unavailable")]
    Unavailable,
}

/// Errors a frame handler can report back to the originating connection.
///
/// None of these close the connection; each becomes a single `error` frame.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("User not found")]
    UserNotFound,

    #[error("Channel not found")]
    ChannelNotFound,

    #[error("Message content must be between 1 and {max} characters")]
    InvalidContent { max: usize },

    #[error("Malformed frame")]
    MalformedFrame,

    #[error("Connection has already joined a channel")]
    DuplicateRegistration,

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl ChatError {
    /// Message placed in the outbound `error` frame.
    ///
    /// Storage details stay in the server log.
    pub fn client_message(&self) -> String {
        match self {
            Self::Storage(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_are_human_readable() {
        assert_eq!(
            ChatError::MissingField("userId").client_message(),
            "userId is required"
        );
        assert_eq!(ChatError::ChannelNotFound.client_message(), "Channel not found");
        assert_eq!(
            ChatError::InvalidContent { max: 2000 }.client_message(),
            "Message content must be between 1 and 2000 characters"
        );
    }

    #[test]
    fn storage_failures_are_not_leaked() {
        let err = ChatError::from(StoreError::Integrity("fk violation on chat_messages".into()));
        assert_eq!(err.client_message(), "Internal error");
        assert!(err.to_string().contains("fk violation"));
    }
}

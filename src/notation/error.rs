use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("Value key '{0}' must be non-empty and contain only letters, digits and underscores")]
    InvalidValueKey(String),
    #[error("Source reference for '{value_key}' has no key, id, index or display path to cite")]
    EmptyReference { value_key: String },
}

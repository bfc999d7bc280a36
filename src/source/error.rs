use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Source reference '{display_path}' carries no index, key or id")]
    EmptyReference { display_path: String },
    #[error("Parsed-document source '{display_path}' has no document location")]
    MissingDocumentLocation { display_path: String },
    #[error("Confidence {confidence} is outside [0, 1]")]
    ConfidenceOutOfRange { confidence: f64 },
}

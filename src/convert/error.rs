use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Vacancy rate must be a finite percentage within [0, 100], got {rate}")]
    InvalidVacancyRate { rate: f64 },
}

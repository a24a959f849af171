use thiserror::Error;

/// Reasons the submit action is refused before anything is sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("A customer must be selected before submitting")]
    NoCustomerSelected,
    #[error("Order has {total} units, a minimum of {minimum} is required")]
    BelowMinimumUnits { total: u32, minimum: u32 },
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Failed to load {source_name}: {reason}")]
    DataLoad { source_name: String, reason: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Customer lookup failed: {0}")]
    CustomerLookup(String),
    #[error("Order submission failed: {0}")]
    Submission(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Prompt aborted: {0}")]
    Prompt(#[from] inquire::InquireError),
}

impl OrderError {
    pub fn data_load(source_name: impl Into<String>, reason: impl ToString) -> Self {
        OrderError::DataLoad {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RfvError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Required column '{column}' missing from table '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("Focus '{focus}' is not configured for the {model} model")]
    UnknownFocus { focus: String, model: String },

    #[error("General composite: focus '{focus}' has no transactions anywhere in the population")]
    EmptyFocusComponent { focus: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RfvResult<T> = Result<T, RfvError>;

use thiserror::Error;

/// Fatal conditions. Each aborts the run and yields exactly one message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("the workbook has no sheet named \"{sheet}\"")]
    MissingSheet { sheet: String },

    #[error("required columns are missing: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("the sheet contains no data rows")]
    NoRows,

    #[error("no valid rows found ({skipped} rows skipped)")]
    NoValidRows { skipped: usize },

    #[error("the file could not be read: {message}")]
    Unexpected { message: String },
}

impl PipelineError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        PipelineError::Unexpected {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_message_lists_every_name() {
        let err = PipelineError::MissingColumns {
            missing: vec!["اسم الطبيب".to_string(), "تاريخ الإرسال".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "required columns are missing: اسم الطبيب, تاريخ الإرسال"
        );
    }
}

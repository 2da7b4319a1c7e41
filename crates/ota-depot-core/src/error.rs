use thiserror::Error;

#[derive(Error, Debug)]
pub enum OtaError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid firmware family: {0}")]
    InvalidFamily(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, OtaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert_with_question_mark() {
        fn open_missing() -> Result<std::fs::File> {
            Ok(std::fs::File::open("/nonexistent/ota-depot/firmware")?)
        }

        let err = open_missing().unwrap_err();
        assert!(matches!(err, OtaError::Io(_)));
        assert!(err.to_string().starts_with("IO error: "));
    }

    #[test]
    fn family_and_config_errors_name_the_value() {
        assert_eq!(
            OtaError::InvalidFamily("..".into()).to_string(),
            "Invalid firmware family: .."
        );
        assert_eq!(
            OtaError::InvalidConfig("port is 0".into()).to_string(),
            "Invalid configuration: port is 0"
        );
    }
}

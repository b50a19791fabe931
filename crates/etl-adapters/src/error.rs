use thiserror::Error;

/// Failures from the archive provider client, the export packager, or
/// object storage. Distinct from [`etl_persistence::WarehouseError`] and
/// [`etl_core::CoreError`] — this crate owns everything that talks to the
/// outside world except the database.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("amplitude credentials missing for source {0:?}")]
    MissingCredentials(&'static str),

    #[error("http request to amplitude failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("archive is not a valid zip: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object store error: {0}")]
    ObjectStore(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_format() {
        let err = SourceError::MissingCredentials("mobile");
        assert_eq!(err.to_string(), "amplitude credentials missing for source \"mobile\"");
    }
}

//! Everything that talks to the outside world on behalf of the pipeline:
//! the Amplitude archive provider, the NDJSON/zip export packager, and
//! object storage.

pub mod archive;
pub mod config;
pub mod error;
pub mod export;
pub mod object_store;

pub use archive::{iter_lines, AmplitudeClient, AmplitudeCredentials, AmplitudeSource};
pub use config::AmplitudeConfig;
pub use error::SourceError;
pub use export::create_ndjson_zip;
pub use object_store::{ObjectStore, S3ObjectStore};

//! Core data model for the user-properties warehouse: the raw record
//! wrapper, the two output projections, the staging row shape, and the
//! mapping catalog that drives extraction. No I/O lives here.

pub mod changeable;
pub mod error;
pub mod mapping;
pub mod permanent;
pub mod raw_record;
pub mod staging;

pub use changeable::ChangeableUserProperties;
pub use error::DomainError;
pub use mapping::{FieldMapping, FieldType, MappingCatalog};
pub use permanent::PermanentUserProperties;
pub use raw_record::{RawRecord, SourceTag};
pub use staging::StagingRow;

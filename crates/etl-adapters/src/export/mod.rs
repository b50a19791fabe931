pub mod packager;

pub use packager::create_ndjson_zip;

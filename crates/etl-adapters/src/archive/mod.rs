pub mod amplitude;

pub use amplitude::{iter_lines, AmplitudeClient, AmplitudeCredentials, AmplitudeSource};

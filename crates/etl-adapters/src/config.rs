//! Archive-provider credentials, read from the environment on demand
//! rather than at process startup — a host that only ever drives one of
//! the two Amplitude sources should not fail to boot over the other
//! source's missing secret.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::archive::{AmplitudeCredentials, AmplitudeSource};
use crate::error::SourceError;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv();
});

pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

/// Credential pairs for both Amplitude projects, as read from
/// `AMPLITUDE_{WEB,MOBILE}_{CLIENT_ID,SECRET_KEY}`.
#[derive(Debug, Clone, Default)]
pub struct AmplitudeConfig {
    pub web_client_id: Option<String>,
    pub web_secret_key: Option<String>,
    pub mobile_client_id: Option<String>,
    pub mobile_secret_key: Option<String>,
}

impl AmplitudeConfig {
    pub fn from_env() -> Self {
        init_dotenv();
        Self {
            web_client_id: env::var("AMPLITUDE_WEB_CLIENT_ID").ok(),
            web_secret_key: env::var("AMPLITUDE_WEB_SECRET_KEY").ok(),
            mobile_client_id: env::var("AMPLITUDE_MOBILE_CLIENT_ID").ok(),
            mobile_secret_key: env::var("AMPLITUDE_MOBILE_SECRET_KEY").ok(),
        }
    }

    /// Resolves the credential pair for `source`, or a [`SourceError::MissingCredentials`]
    /// naming that source when either half of the pair is absent.
    pub fn credentials_for(&self, source: AmplitudeSource) -> Result<AmplitudeCredentials, SourceError> {
        let (client_id, secret_key, label) = match source {
            AmplitudeSource::Web => (&self.web_client_id, &self.web_secret_key, "web"),
            AmplitudeSource::Mobile => (&self.mobile_client_id, &self.mobile_secret_key, "mobile"),
        };
        match (client_id, secret_key) {
            (Some(id), Some(key)) => {
                Ok(AmplitudeCredentials { client_id: id.clone(), secret_key: key.clone() })
            }
            _ => Err(SourceError::MissingCredentials(label)),
        }
    }
}

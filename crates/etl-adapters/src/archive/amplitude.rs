use std::collections::VecDeque;
use std::io::Read;
use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use chrono::NaiveDate;
use futures::stream::{self, Stream};

use crate::error::SourceError;

const BASE_URL: &str = "https://amplitude.com/api/2/export";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(2000);

/// Which credential pair to export with. The provider issues separate
/// client id/secret pairs for its web and mobile projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmplitudeSource {
    Web,
    Mobile,
}

#[derive(Debug, Clone)]
pub struct AmplitudeCredentials {
    pub client_id: String,
    pub secret_key: String,
}

/// Thin HTTP client over the Amplitude export endpoint. Holds no secrets
/// beyond what [`AmplitudeCredentials`] was constructed with; callers read
/// those out of configuration.
#[derive(Debug, Clone)]
pub struct AmplitudeClient {
    source: AmplitudeSource,
    credentials: AmplitudeCredentials,
    http: reqwest::Client,
}

impl AmplitudeClient {
    pub fn new(source: AmplitudeSource, credentials: AmplitudeCredentials) -> Self {
        let http = reqwest::Client::builder()
            .timeout(EXPORT_TIMEOUT)
            .build()
            .expect("reqwest client builder should not fail with static config");
        Self { source, credentials, http }
    }

    pub fn source(&self) -> AmplitudeSource {
        self.source
    }

    fn auth_header(&self) -> String {
        let token = format!("{}:{}", self.credentials.client_id, self.credentials.secret_key);
        format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(token))
    }

    /// Downloads the raw zip for one calendar day (`00:00`–`23:59`, provider
    /// local time as encoded in the `YYYYMMDDTHH` export format).
    async fn export_day(&self, day: NaiveDate) -> Result<Bytes, SourceError> {
        let day_str = day.format("%Y%m%d").to_string();
        let response = self
            .http
            .get(BASE_URL)
            .header("Authorization", self.auth_header())
            .query(&[("start", format!("{day_str}T00")), ("end", format!("{day_str}T23"))])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?)
    }
}

fn extract_lines_from_zip(zip_bytes: &Bytes) -> Result<Vec<String>, SourceError> {
    let cursor = std::io::Cursor::new(zip_bytes.as_ref());
    let mut archive = zip::ZipArchive::new(cursor)?;
    let mut lines = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if !entry.name().ends_with(".gz") {
            continue;
        }
        let mut compressed = Vec::new();
        entry.read_to_end(&mut compressed)?;
        let mut decoder = flate2::read::GzDecoder::new(compressed.as_slice());
        let mut text = String::new();
        decoder.read_to_string(&mut text)?;
        for line in text.lines() {
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
        }
    }

    Ok(lines)
}

struct IterLinesState {
    client: AmplitudeClient,
    current: Option<NaiveDate>,
    end: NaiveDate,
    buffer: VecDeque<String>,
}

/// Yields one JSON line per event across `[start, end]` inclusive, fetching
/// and decompressing one day's archive at a time. A failure on any day
/// ends the stream immediately after surfacing that one error — remaining
/// days are never attempted.
pub fn iter_lines(
    client: AmplitudeClient,
    start: NaiveDate,
    end: NaiveDate,
) -> impl Stream<Item = Result<String, SourceError>> {
    let state = IterLinesState { client, current: Some(start), end, buffer: VecDeque::new() };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.buffer.pop_front() {
                return Some((Ok(line), state));
            }

            let day = state.current?;
            if day > state.end {
                return None;
            }

            match state.client.export_day(day).await {
                Ok(zip_bytes) => match extract_lines_from_zip(&zip_bytes) {
                    Ok(lines) => {
                        state.buffer = lines.into();
                        state.current = day.succ_opt();
                    }
                    Err(e) => {
                        state.current = None;
                        return Some((Err(e), state));
                    }
                },
                Err(e) => {
                    state.current = None;
                    return Some((Err(e), state));
                }
            }
        }
    })
}

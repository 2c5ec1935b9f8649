use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use reqwest::blocking::Client;

use crate::aggregate::{AggregateResult, AggregateSettings, Aggregator};
use crate::error::{Error, Result};
use crate::history::{PlayEvent, parse_history, read_history_dir, read_history_file};

/// Where a listening history comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistorySource {
    File(PathBuf),
    Directory(PathBuf),
    Url(String),
}

impl HistorySource {
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            return HistorySource::Url(value.to_string());
        }
        let path = PathBuf::from(value);
        if path.is_dir() {
            HistorySource::Directory(path)
        } else {
            HistorySource::File(path)
        }
    }

    pub fn read_events(&self) -> Result<Vec<PlayEvent>> {
        match self {
            HistorySource::File(path) => read_history_file(path),
            HistorySource::Directory(path) => read_history_dir(path),
            HistorySource::Url(url) => fetch_history(&http_client(url)?, url),
        }
    }
}

impl fmt::Display for HistorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistorySource::File(path) | HistorySource::Directory(path) => {
                write!(f, "{}", path.display())
            }
            HistorySource::Url(url) => f.write_str(url),
        }
    }
}

fn http_client(url: &str) -> Result<Client> {
    Client::builder()
        .build()
        .map_err(|err| Error::source_unavailable(url, err))
}

fn fetch_history(http: &Client, url: &str) -> Result<Vec<PlayEvent>> {
    let response = http
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(|err| Error::source_unavailable(url, err))?;
    let text = response
        .text()
        .map_err(|err| Error::source_unavailable(url, err))?;
    tracing::debug!(url, bytes = text.len(), "Fetched history");
    parse_history(&text, url)
}

/// Reads `source` and aggregates it in one go.
pub fn load(source: &HistorySource, settings: AggregateSettings) -> Result<AggregateResult> {
    let events = source.read_events()?;
    let result = Aggregator::new(settings).ingest(&events);
    tracing::info!(
        source = %source,
        events = events.len(),
        days = result.daily_totals.len(),
        "History ready"
    );
    Ok(result)
}

/// Runs [`load`] on a worker thread. The outcome is delivered exactly once,
/// and only as a complete result or an error.
pub fn spawn_load(source: HistorySource, settings: AggregateSettings) -> PendingLoad {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let outcome = load(&source, settings);
        if let Err(err) = &outcome {
            tracing::warn!(source = %source, error = %err, "History load failed");
        }
        // The receiver may be gone if the caller lost interest.
        let _ = sender.send(outcome);
    });
    PendingLoad { receiver }
}

pub struct PendingLoad {
    receiver: Receiver<Result<AggregateResult>>,
}

impl PendingLoad {
    /// Blocks until the load finished.
    pub fn wait(self) -> Result<AggregateResult> {
        self.receiver
            .recv()
            .map_err(|_| Error::LoaderDisconnected)?
    }

    /// Returns the outcome if the load already finished, without blocking.
    /// Once an outcome was returned, later calls report a disconnected loader.
    pub fn try_ready(&self) -> Option<Result<AggregateResult>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::LoaderDisconnected)),
        }
    }
}

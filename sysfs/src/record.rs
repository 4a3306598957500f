// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Debug recording.
//!
//! A [`Recorder`] sits between the probe and the real source and keeps every query with its
//! answer.  At the end of the run it is turned into an [`Archive`], which also carries the
//! command line, the rendered report and a description of the software environment, and is
//! written out as a single YAML document.

use crate::{FieldSource, SourceError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Commands describing the software environment, keyed by archive section name.
const ENVIRONMENT: [(&str, &str); 5] = [
    ("ofed", "ofed_info -s"),
    ("mst", "mst version"),
    ("uname", "uname -a"),
    ("release", "cat /etc/*release"),
    ("env", "env"),
];

/// The kind of a recorded query.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Run,
    ReadFile,
    ReadLink,
    ListDir,
}

/// What a query returned.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Lines(Vec<String>),
    Text(String),
    Entries(BTreeSet<String>),
}

/// One query and its answer.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RecordedQuery {
    pub kind: QueryKind,
    /// The command line or path.
    pub key: String,
    pub answer: Answer,
}

/// Everything captured during one recorded run.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Archive {
    pub version: String,
    pub hostname: String,
    pub unix_seconds: i64,
    pub recorded_at: String,
    pub command_line: String,
    pub report: String,
    pub environment: BTreeMap<String, Vec<String>>,
    pub queries: Vec<RecordedQuery>,
}

/// Failure to store an [`Archive`].
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("failed to query the software environment: {0}")]
    Environment(#[from] SourceError),
    #[error("failed to get hostname: {}", .0.desc())]
    Hostname(nix::Error),
    #[error("failed to create record directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize record archive: {0}")]
    Serialize(#[from] serde_yaml_ng::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A [`FieldSource`] decorator which keeps a transcript of every query.
#[derive(Debug)]
pub struct Recorder<S> {
    inner: S,
    queries: RefCell<Vec<RecordedQuery>>,
}

impl<S: FieldSource> Recorder<S> {
    #[must_use]
    pub fn new(inner: S) -> Recorder<S> {
        Recorder {
            inner,
            queries: RefCell::new(Vec::new()),
        }
    }

    fn keep(&self, kind: QueryKind, key: &str, answer: Answer) {
        self.queries.borrow_mut().push(RecordedQuery {
            kind,
            key: key.to_string(),
            answer,
        });
    }

    /// Number of queries recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.borrow().is_empty()
    }

    /// Close the transcript.
    ///
    /// The environment commands are run on the wrapped source and are not part of the
    /// transcript themselves.
    ///
    /// # Errors
    ///
    /// Fails if the hostname can not be determined or an environment command can not be run.
    pub fn finish(
        self,
        command_line: impl Into<String>,
        report: impl Into<String>,
    ) -> Result<Archive, RecordError> {
        let mut environment = BTreeMap::new();
        for (section, command) in ENVIRONMENT {
            environment.insert(section.to_string(), self.inner.run(command, false)?);
        }
        let hostname = nix::unistd::gethostname()
            .map_err(RecordError::Hostname)?
            .to_string_lossy()
            .into_owned();
        let now = chrono::Utc::now();
        Ok(Archive {
            version: env!("CARGO_PKG_VERSION").to_string(),
            hostname,
            unix_seconds: now.timestamp(),
            recorded_at: now.to_rfc3339(),
            command_line: command_line.into(),
            report: report.into(),
            environment,
            queries: self.queries.into_inner(),
        })
    }
}

impl<S: FieldSource> FieldSource for Recorder<S> {
    fn run(&self, command: &str, cacheable: bool) -> Result<Vec<String>, SourceError> {
        let lines = self.inner.run(command, cacheable)?;
        self.keep(QueryKind::Run, command, Answer::Lines(lines.clone()));
        Ok(lines)
    }

    fn read_file(&self, path: &str) -> Result<String, SourceError> {
        let text = self.inner.read_file(path)?;
        self.keep(QueryKind::ReadFile, path, Answer::Text(text.clone()));
        Ok(text)
    }

    fn read_link(&self, path: &str) -> Result<String, SourceError> {
        let target = self.inner.read_link(path)?;
        self.keep(QueryKind::ReadLink, path, Answer::Text(target.clone()));
        Ok(target)
    }

    fn list_dir(&self, path: &str) -> Result<BTreeSet<String>, SourceError> {
        let entries = self.inner.list_dir(path)?;
        self.keep(QueryKind::ListDir, path, Answer::Entries(entries.clone()));
        Ok(entries)
    }
}

impl Archive {
    /// `<hostname>--<unix seconds>.yaml`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}--{}.yaml", self.hostname, self.unix_seconds)
    }

    /// Write the archive into `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Fails if the directory or the file can not be written.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, RecordError> {
        std::fs::create_dir_all(dir).map_err(|source| RecordError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(self.file_name());
        let yaml = serde_yaml_ng::to_string(self)?;
        std::fs::write(&path, yaml).map_err(|source| RecordError::Write {
            path: path.clone(),
            source,
        })?;
        debug!("{} queries recorded", self.queries.len());
        info!("record archive written to {}", path.display());
        Ok(path)
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Raw data sources.
//!
//! Everything the inventory knows about the host comes through a [`FieldSource`]: the output of
//! shell commands (`lspci`, vendor tools), the content of sysfs/procfs/configfs files, symlink
//! targets and directory listings.  Absence is never an error: a missing file reads as an empty
//! string, a missing directory lists as empty, and a command which fails simply has no output.
//!
//! Implementations:
//!
//! - [`host::HostSource`]: the live host, with a per-run cache of command output.
//! - [`record::Recorder`]: wraps another source and keeps a transcript of every query for
//!   offline debugging.
//! - `fixture::FixtureSource` (feature `fixture`): canned data for tests.

#![deny(clippy::pedantic, clippy::unwrap_used)]

use std::collections::BTreeSet;

pub mod host;
pub mod record;

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

/// OS level failures other than "not found".
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to read link {path}: {source}")]
    ReadLink {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to list {path}: {source}")]
    ListDir {
        path: String,
        source: std::io::Error,
    },
}

/// Query primitives used by the probe.
pub trait FieldSource {
    /// Run `command` through `sh -c` and return its standard output, one entry per line.
    ///
    /// A non-zero exit status is not an error; the output is returned as is.  With `cacheable`
    /// set, identical commands are only executed once per run.
    ///
    /// # Errors
    ///
    /// Fails if the shell can not be started.
    fn run(&self, command: &str, cacheable: bool) -> Result<Vec<String>, SourceError>;

    /// Content of the file at `path`, or an empty string if it does not exist.
    ///
    /// # Errors
    ///
    /// Fails on any other OS error.
    fn read_file(&self, path: &str) -> Result<String, SourceError>;

    /// Target of the symlink at `path`, or an empty string if it does not exist.
    ///
    /// # Errors
    ///
    /// Fails on any other OS error.
    fn read_link(&self, path: &str) -> Result<String, SourceError>;

    /// Names of the entries of the directory at `path`, or nothing if it does not exist.
    ///
    /// # Errors
    ///
    /// Fails on any other OS error.
    fn list_dir(&self, path: &str) -> Result<BTreeSet<String>, SourceError>;
}

impl<S: FieldSource + ?Sized> FieldSource for &S {
    fn run(&self, command: &str, cacheable: bool) -> Result<Vec<String>, SourceError> {
        (**self).run(command, cacheable)
    }

    fn read_file(&self, path: &str) -> Result<String, SourceError> {
        (**self).read_file(path)
    }

    fn read_link(&self, path: &str) -> Result<String, SourceError> {
        (**self).read_link(path)
    }

    fn list_dir(&self, path: &str) -> Result<BTreeSet<String>, SourceError> {
        (**self).list_dir(path)
    }
}

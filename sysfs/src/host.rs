// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The live host.

use crate::{FieldSource, SourceError};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::process::{Command, Stdio};
use tracing::{debug, trace};

/// [`FieldSource`] backed by the running system.
///
/// Output of cacheable commands is kept for the life of the source, keyed by the exact command
/// string.
#[derive(Debug, Default)]
pub struct HostSource {
    cache: RefCell<HashMap<String, Vec<String>>>,
}

impl HostSource {
    #[must_use]
    pub fn new() -> HostSource {
        HostSource::default()
    }
}

impl FieldSource for HostSource {
    fn run(&self, command: &str, cacheable: bool) -> Result<Vec<String>, SourceError> {
        if cacheable {
            if let Some(lines) = self.cache.borrow().get(command) {
                trace!("cache hit for `{command}`");
                return Ok(lines.clone());
            }
        }
        debug!("running `{command}`");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| SourceError::Spawn {
                command: command.to_string(),
                source,
            })?;
        if !output.status.success() {
            trace!(
                "`{command}` exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        if cacheable {
            self.cache
                .borrow_mut()
                .insert(command.to_string(), lines.clone());
        }
        Ok(lines)
    }

    fn read_file(&self, path: &str) -> Result<String, SourceError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(SourceError::Read {
                path: path.to_string(),
                source,
            }),
        }
    }

    fn read_link(&self, path: &str) -> Result<String, SourceError> {
        match std::fs::read_link(path) {
            Ok(target) => Ok(target.to_string_lossy().into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(SourceError::ReadLink {
                path: path.to_string(),
                source,
            }),
        }
    }

    fn list_dir(&self, path: &str) -> Result<BTreeSet<String>, SourceError> {
        let error = |source| SourceError::ListDir {
            path: path.to_string(),
            source,
        };
        let entries = match std::fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(source) => return Err(error(source)),
        };
        let mut names = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(error)?;
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn cacheable_commands_run_once() {
        let source = HostSource::new();
        let first = source.run("echo one; echo two", true).unwrap();
        let second = source.run("echo one; echo two", true).unwrap();
        assert_eq!(first, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(first, second);
        assert!(logs_contain("cache hit for `echo one; echo two`"));
    }

    #[test]
    fn failing_command_is_not_an_error() {
        let source = HostSource::new();
        let lines = source.run("echo partial; exit 3", false).unwrap();
        assert_eq!(lines, vec!["partial".to_string()]);
    }

    #[test]
    fn missing_paths_are_empty() {
        let source = HostSource::new();
        let missing = "/nonexistent/lshca/test/path";
        assert_eq!(source.read_file(missing).unwrap(), "");
        assert_eq!(source.read_link(missing).unwrap(), "");
        assert!(source.list_dir(missing).unwrap().is_empty());
    }

    #[test]
    fn reads_real_files() {
        let dir = std::env::temp_dir().join(format!("lshca-host-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("numa_node"), "1\n").unwrap();
        let source = HostSource::new();
        let base = dir.to_string_lossy();
        assert_eq!(source.read_file(&format!("{base}/numa_node")).unwrap(), "1\n");
        assert_eq!(
            source.list_dir(&base).unwrap(),
            BTreeSet::from(["numa_node".to_string()])
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Canned data source for tests.

use crate::record::{Answer, Archive, QueryKind};
use crate::{FieldSource, SourceError};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

/// In-memory [`FieldSource`].
///
/// Unknown commands produce no output and unknown paths do not exist, just like on a host
/// without the corresponding tool or driver.  Directory listings are derived from the files
/// and links registered below the directory unless set explicitly.
#[derive(Debug, Default)]
pub struct FixtureSource {
    commands: BTreeMap<String, Vec<String>>,
    files: BTreeMap<String, String>,
    links: BTreeMap<String, String>,
    dirs: BTreeMap<String, BTreeSet<String>>,
    executed: RefCell<Vec<String>>,
}

impl FixtureSource {
    #[must_use]
    pub fn with_command<I, L>(mut self, command: &str, lines: I) -> FixtureSource
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.commands
            .insert(command.to_string(), lines.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_file(mut self, path: &str, content: &str) -> FixtureSource {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    #[must_use]
    pub fn with_link(mut self, path: &str, target: &str) -> FixtureSource {
        self.links.insert(path.to_string(), target.to_string());
        self
    }

    /// Register a directory (possibly empty) with an explicit listing.
    #[must_use]
    pub fn with_dir<I, E>(mut self, path: &str, entries: I) -> FixtureSource
    where
        I: IntoIterator<Item = E>,
        E: Into<String>,
    {
        self.dirs
            .insert(path.to_string(), entries.into_iter().map(Into::into).collect());
        self
    }

    /// Replay the transcript of a recorded run.
    #[must_use]
    pub fn from_archive(archive: &Archive) -> FixtureSource {
        let mut fixture = FixtureSource::default();
        for query in &archive.queries {
            let key = query.key.clone();
            match (query.kind, &query.answer) {
                (QueryKind::Run, Answer::Lines(lines)) => {
                    fixture.commands.insert(key, lines.clone());
                }
                (QueryKind::ReadFile, Answer::Text(text)) if !text.is_empty() => {
                    fixture.files.insert(key, text.clone());
                }
                (QueryKind::ReadLink, Answer::Text(target)) if !target.is_empty() => {
                    fixture.links.insert(key, target.clone());
                }
                (QueryKind::ListDir, Answer::Entries(entries)) => {
                    fixture.dirs.insert(key, entries.clone());
                }
                _ => {}
            }
        }
        fixture
    }

    /// Every command passed to [`FieldSource::run`], in order.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }
}

impl FieldSource for FixtureSource {
    fn run(&self, command: &str, _cacheable: bool) -> Result<Vec<String>, SourceError> {
        self.executed.borrow_mut().push(command.to_string());
        Ok(self.commands.get(command).cloned().unwrap_or_default())
    }

    fn read_file(&self, path: &str) -> Result<String, SourceError> {
        Ok(self.files.get(path).cloned().unwrap_or_default())
    }

    fn read_link(&self, path: &str) -> Result<String, SourceError> {
        Ok(self.links.get(path).cloned().unwrap_or_default())
    }

    fn list_dir(&self, path: &str) -> Result<BTreeSet<String>, SourceError> {
        if let Some(entries) = self.dirs.get(path) {
            return Ok(entries.clone());
        }
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let entries = self
            .files
            .keys()
            .chain(self.links.keys())
            .filter_map(|known| known.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();
        Ok(entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn listing_is_derived_from_registered_paths() {
        let fixture = FixtureSource::default()
            .with_file("/sys/class/infiniband/mlx5_0/ports/1/state", "4: ACTIVE")
            .with_file("/sys/class/infiniband/mlx5_0/ports/2/state", "1: DOWN")
            .with_link("/sys/class/infiniband/mlx5_0/device", "../../../0000:01:00.0");
        assert_eq!(
            fixture.list_dir("/sys/class/infiniband/mlx5_0/ports").unwrap(),
            BTreeSet::from(["1".to_string(), "2".to_string()])
        );
        assert_eq!(
            fixture.list_dir("/sys/class/infiniband/mlx5_0/").unwrap(),
            BTreeSet::from(["device".to_string(), "ports".to_string()])
        );
        assert!(fixture.list_dir("/sys/class/net").unwrap().is_empty());
    }

    #[test]
    fn explicit_directories_win() {
        let fixture = FixtureSource::default()
            .with_file("/a/b", "x")
            .with_dir("/a", ["c"]);
        assert_eq!(
            fixture.list_dir("/a").unwrap(),
            BTreeSet::from(["c".to_string()])
        );
    }

    #[test]
    fn unknown_queries_are_empty() {
        let fixture = FixtureSource::default();
        assert!(fixture.run("mget_temp -d mlx5_0", true).unwrap().is_empty());
        assert_eq!(fixture.read_file("/proc/sys/net/ipv4/tcp_ecn").unwrap(), "");
        assert_eq!(fixture.executed(), vec!["mget_temp -d mlx5_0".to_string()]);
    }
}

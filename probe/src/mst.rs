// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Mellanox Software Tools device paths.

use crate::scrape::{capture, pattern};
use hardware::pci::PciAddress;
use sysfs::{FieldSource, SourceError};
use tracing::{debug, error};

pattern!(MST_PATH = r"(/dev/mst/\S+)");

/// Snapshot of `mst status -v`.
#[derive(Clone, Debug)]
pub struct MstStatus {
    lines: Vec<String>,
    short_addresses: bool,
}

impl MstStatus {
    /// Query `mst status -v`, loading the MST kernel modules for the duration of the query if
    /// they are not loaded yet.
    ///
    /// Returns `None` (and logs an error) if the `mst` tool is not installed.  `mst` prints
    /// addresses without domain when every device is in domain `0000`, so `addresses` must list
    /// every enumerated function.
    ///
    /// # Errors
    ///
    /// Fails if the shell can not be started.
    pub fn load<S: FieldSource>(
        source: &S,
        addresses: &[PciAddress],
    ) -> Result<Option<MstStatus>, SourceError> {
        if source.run("which mst > /dev/null 2>&1 ; echo $?", true)? != ["0"] {
            error!("MST tool is missing");
            return Ok(None);
        }
        let running = source.run(
            "mst status | grep -c 'MST PCI configuration module loaded'",
            true,
        )? != ["0"];
        if !running {
            debug!("starting mst for the duration of the query");
            source.run("mst start", true)?;
        }
        let lines = source.run("mst status -v", true)?;
        if !running {
            source.run("mst stop", true)?;
        }
        Ok(Some(MstStatus {
            lines,
            short_addresses: addresses.iter().all(|address| address.domain() == 0),
        }))
    }

    /// The `/dev/mst` path of the function at `address`.
    #[must_use]
    pub fn device(&self, address: PciAddress) -> Option<String> {
        let needle = if self.short_addresses {
            address.short().to_string()
        } else {
            address.to_string()
        };
        self.lines
            .iter()
            .rev()
            .filter(|line| line.contains(&needle))
            .find_map(|line| capture(&MST_PATH, line))
    }
}

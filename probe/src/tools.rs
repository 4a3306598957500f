// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Vendor tools: `mget_temp` and `mlnx_qos`.

use crate::scrape::{capture_in, pattern};
use sysfs::{FieldSource, SourceError};

pattern!(TEMPERATURE = r"^\s*([0-9]+)\s*$");
pattern!(TRUST_STATE = r"Priority trust state: (.*)");
pattern!(PFC_ENABLED = r"^\s+enabled\s+((?:[0-9]\s*)+)$");

/// Adapter temperature in degrees Celsius.
///
/// # Errors
///
/// Fails if the shell can not be started.
pub fn temperature<S: FieldSource>(source: &S, rdma: &str) -> Result<Option<i32>, SourceError> {
    let lines = source.run(&format!("mget_temp -d {rdma}"), true)?;
    Ok(capture_in(&lines, &TEMPERATURE, &TEMPERATURE).and_then(|celsius| celsius.parse().ok()))
}

/// QoS settings of a network interface, as reported by `mlnx_qos`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QosSettings {
    /// `pcp` or `dscp`.
    pub trust: Option<String>,
    /// Per priority PFC enable bits, priority 0 first (`00010000`).
    pub pfc: Option<String>,
}

impl QosSettings {
    /// # Errors
    ///
    /// Fails if the shell can not be started.
    pub fn query<S: FieldSource>(source: &S, net: &str) -> Result<QosSettings, SourceError> {
        let lines = source.run(&format!("mlnx_qos -i {net}"), true)?;
        Ok(QosSettings {
            trust: capture_in(&lines, &TRUST_STATE, &TRUST_STATE),
            pfc: capture_in(&lines, &PFC_ENABLED, &PFC_ENABLED)
                .map(|bits| bits.split_whitespace().collect()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use sysfs::fixture::FixtureSource;

    #[test]
    fn temperature_is_a_bare_number() {
        let source = FixtureSource::default().with_command("mget_temp -d mlx5_0", ["-E- something", "57 "]);
        assert_eq!(temperature(&source, "mlx5_0").unwrap(), Some(57));
        assert_eq!(temperature(&source, "mlx5_1").unwrap(), None);
    }

    #[test]
    fn qos_trust_and_pfc() {
        let source = FixtureSource::default().with_command(
            "mlnx_qos -i ens1f0",
            [
                "DCBX mode: OS controlled",
                "Priority trust state: dscp",
                "dscp2prio mapping:",
                "Receive buffer size (bytes): 130944,130944,0,0,0,0,0,0,",
                "Cable len: 7",
                "PFC configuration:",
                "\tpriority    0   1   2   3   4   5   6   7",
                "\tenabled     0   0   0   1   0   0   0   0   ",
                "\tbuffer      0   0   0   1   0   0   0   0   ",
            ],
        );
        assert_eq!(
            QosSettings::query(&source, "ens1f0").unwrap(),
            QosSettings {
                trust: Some("dscp".to_string()),
                pfc: Some("00010000".to_string()),
            }
        );
    }
}

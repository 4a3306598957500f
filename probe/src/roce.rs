// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! RoCE lossless configuration check.

use crate::scrape::non_empty;
use crate::tools::QosSettings;
use hardware::nic::RoceStatus;
use sysfs::{FieldSource, SourceError};
use tracing::debug;

/// The settings a RoCE port needs for lossless operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LosslessBaseline {
    /// `mlnx_qos` priority trust state.
    pub trust: String,
    /// `mlnx_qos` PFC enable bits.
    pub pfc: String,
    /// Content of `infiniband/<rdma>/tc/1/traffic_class`.
    pub traffic_class: String,
    /// Content of `/proc/sys/net/ipv4/tcp_ecn`.
    pub tcp_ecn: String,
    /// Content of the rdma_cm `default_roce_tos` configfs attribute.
    pub rdma_cm_tos: String,
}

impl Default for LosslessBaseline {
    fn default() -> Self {
        LosslessBaseline {
            trust: "dscp".to_string(),
            pfc: "00010000".to_string(),
            traffic_class: "Global tclass=106".to_string(),
            tcp_ecn: "1".to_string(),
            rdma_cm_tos: "106".to_string(),
        }
    }
}

/// Compare the RoCE settings of one port against `baseline`.
///
/// The rdma_cm configfs directory is only read if it already exists; it is never created.
///
/// # Errors
///
/// Fails on OS errors other than missing files.
pub fn roce_status<S: FieldSource>(
    source: &S,
    device_dir: &str,
    rdma: &str,
    net: Option<&str>,
    baseline: &LosslessBaseline,
) -> Result<RoceStatus, SourceError> {
    let read = |path: &str| -> Result<String, SourceError> {
        Ok(non_empty(&source.read_file(path)?).unwrap_or_default())
    };
    let traffic_class = read(&format!("{device_dir}/infiniband/{rdma}/tc/1/traffic_class"))?;
    let tcp_ecn = read("/proc/sys/net/ipv4/tcp_ecn")?;
    let rdma_cm_tos = read(&format!(
        "/sys/kernel/config/rdma_cm/{rdma}/ports/1/default_roce_tos"
    ))?;
    let qos = match net {
        Some(net) => QosSettings::query(source, net)?,
        None => QosSettings::default(),
    };

    let checks = [
        ("traffic class", Some(traffic_class.as_str()), baseline.traffic_class.as_str()),
        ("tcp_ecn", Some(tcp_ecn.as_str()), baseline.tcp_ecn.as_str()),
        ("rdma_cm tos", Some(rdma_cm_tos.as_str()), baseline.rdma_cm_tos.as_str()),
        ("trust", qos.trust.as_deref(), baseline.trust.as_str()),
        ("pfc", qos.pfc.as_deref(), baseline.pfc.as_str()),
    ];
    let mut status = RoceStatus::Lossless;
    for (setting, actual, expected) in checks {
        if actual != Some(expected) {
            debug!("{rdma}: {setting} is {actual:?}, lossless needs {expected:?}");
            status = RoceStatus::Lossy;
        }
    }
    Ok(status)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use sysfs::fixture::FixtureSource;

    const DIR: &str = "/sys/bus/pci/devices/0000:3b:00.0";

    fn lossless() -> FixtureSource {
        FixtureSource::default()
            .with_file(
                &format!("{DIR}/infiniband/mlx5_2/tc/1/traffic_class"),
                "Global tclass=106\n",
            )
            .with_file("/proc/sys/net/ipv4/tcp_ecn", "1\n")
            .with_file(
                "/sys/kernel/config/rdma_cm/mlx5_2/ports/1/default_roce_tos",
                "106\n",
            )
            .with_command(
                "mlnx_qos -i ens2f0",
                [
                    "Priority trust state: dscp",
                    "\tenabled     0   0   0   1   0   0   0   0   ",
                ],
            )
    }

    #[test]
    fn matching_settings_are_lossless() {
        let status = roce_status(
            &lossless(),
            DIR,
            "mlx5_2",
            Some("ens2f0"),
            &LosslessBaseline::default(),
        )
        .unwrap();
        assert_eq!(status, RoceStatus::Lossless);
    }

    #[test]
    fn any_difference_is_lossy() {
        let source = lossless().with_file("/proc/sys/net/ipv4/tcp_ecn", "2\n");
        let status = roce_status(&source, DIR, "mlx5_2", Some("ens2f0"), &LosslessBaseline::default()).unwrap();
        assert_eq!(status, RoceStatus::Lossy);
    }

    #[test]
    fn missing_configfs_entry_is_lossy_not_created() {
        let source = FixtureSource::default();
        let status = roce_status(&source, DIR, "mlx5_2", None, &LosslessBaseline::default()).unwrap();
        assert_eq!(status, RoceStatus::Lossy);
        assert!(source.executed().is_empty());
    }

    #[test]
    fn custom_baseline() {
        let baseline = LosslessBaseline {
            tcp_ecn: "2".to_string(),
            ..LosslessBaseline::default()
        };
        let source = lossless().with_file("/proc/sys/net/ipv4/tcp_ecn", "2\n");
        let status = roce_status(&source, DIR, "mlx5_2", Some("ens2f0"), &baseline).unwrap();
        assert_eq!(status, RoceStatus::Lossless);
    }
}

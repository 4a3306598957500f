// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Subnet administrator queries: the switch a port is cabled to and the subnet manager.

use crate::scrape::{capture, capture_in, pattern};
use sysfs::{FieldSource, SourceError};
use tracing::debug;

pattern!(TO_LID_LINE = r"ToLID");
pattern!(NODE_GUID_LINE = r"node_guid");
pattern!(NODE_DESCRIPTION_LINE = r"NodeDescription");
pattern!(GUID_LINE = r"GUID");
pattern!(DOTTED_NUMBER = r"\.+([0-9]+)");
pattern!(DOTTED_VALUE = r"\.+(.*)");
pattern!(HEX_VALUE = r"0x(.*)");

/// Fabric neighbours of one IB port.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FabricInfo {
    pub sw_guid: Option<String>,
    pub sw_description: Option<String>,
    pub sm_guid: Option<String>,
}

impl FabricInfo {
    /// Ask the subnet administrator about the switch behind `lid` and the subnet manager at
    /// `sm_lid`.
    ///
    /// # Errors
    ///
    /// Fails if the shell can not be started.
    pub fn query<S: FieldSource>(
        source: &S,
        rdma: &str,
        port: u8,
        lid: u16,
        sm_lid: u16,
    ) -> Result<FabricInfo, SourceError> {
        let saquery = |record: &str, lid: &str| {
            source.run(&format!("saquery {record} -C {rdma} -P {port} {lid}"), false)
        };
        let mut info = FabricInfo::default();

        let link = saquery("LR", &lid.to_string())?;
        if let Some(switch_lid) = capture_in(&link, &TO_LID_LINE, &DOTTED_NUMBER) {
            let node = saquery("NR", &switch_lid)?;
            info.sw_guid = capture_in(&node, &NODE_GUID_LINE, &DOTTED_VALUE)
                .and_then(|guid| capture(&HEX_VALUE, &guid));
            info.sw_description = capture_in(&node, &NODE_DESCRIPTION_LINE, &DOTTED_VALUE);
        } else {
            debug!("no link record for {rdma} port {port}");
        }

        let manager = saquery("SMIR", &sm_lid.to_string())?;
        info.sm_guid = capture_in(&manager, &GUID_LINE, &DOTTED_VALUE)
            .and_then(|guid| capture(&HEX_VALUE, &guid));
        Ok(info)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use sysfs::fixture::FixtureSource;

    #[test]
    fn switch_and_subnet_manager() {
        let source = FixtureSource::default()
            .with_command(
                "saquery LR -C mlx5_0 -P 1 26",
                [
                    "LinkRecord dump:",
                    "\t\tFromLID....................26",
                    "\t\tFromPort...................1",
                    "\t\tToPort.....................17",
                    "\t\tToLID......................3",
                ],
            )
            .with_command(
                "saquery NR -C mlx5_0 -P 1 3",
                [
                    "NodeRecord dump:",
                    "\t\tlid.....................0x3",
                    "\t\tnode_guid...............0x248a070300f8d1c0",
                    "\t\tNodeDescription.........MF0;leaf-01:MQM8700/U1",
                ],
            )
            .with_command(
                "saquery SMIR -C mlx5_0 -P 1 1",
                [
                    "SMInfoRecord dump:",
                    "\t\tRID",
                    "\t\tLID...................1",
                    "\t\tSMInfo dump:",
                    "\t\tGUID..................0x0002c90300a1b2c3",
                ],
            );
        assert_eq!(
            FabricInfo::query(&source, "mlx5_0", 1, 26, 1).unwrap(),
            FabricInfo {
                sw_guid: Some("248a070300f8d1c0".to_string()),
                sw_description: Some("MF0;leaf-01:MQM8700/U1".to_string()),
                sm_guid: Some("0002c90300a1b2c3".to_string()),
            }
        );
    }

    #[test]
    fn unreachable_fabric() {
        let source = FixtureSource::default();
        assert_eq!(
            FabricInfo::query(&source, "mlx5_0", 1, 26, 1).unwrap(),
            FabricInfo::default()
        );
        assert!(!source.executed().iter().any(|command| command.starts_with("saquery NR")));
    }
}

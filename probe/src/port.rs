// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Driver state of one function and port, read from `/sys/bus/pci/devices`.

use crate::ProbeError;
use crate::scrape::{capture, non_empty, pattern};
use hardware::nic::{LinkLayer, PortState};
use hardware::pci::PciAddress;
use sysfs::FieldSource;
use tracing::warn;

pattern!(PHYSFN_TARGET = r".*/([0-9].*)");
pattern!(LEADING_NUMBER = r"^([0-9]+)");
pattern!(GID_PREFIX = r"^((?:[A-Fa-f0-9]{4}:){4})");
pattern!(GID_GUID = r"((?::[A-Fa-f0-9]{4}){4})$");

/// `/sys/bus/pci/devices/<address>`
#[must_use]
pub fn device_dir(address: PciAddress) -> String {
    format!("/sys/bus/pci/devices/{address}")
}

/// Driver view of one port of one PCI function.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SysfsPort {
    /// Owning physical function, for virtual functions.
    pub parent: Option<PciAddress>,
    pub numa: Option<String>,
    pub rdma: Option<String>,
    pub net: Option<String>,
    pub hca_type: Option<String>,
    pub firmware: Option<String>,
    pub port_count: u8,
    pub state: Option<PortState>,
    pub link_layer: Option<LinkLayer>,
    pub rate: Option<String>,
    pub lid: Option<u16>,
    pub sm_lid: Option<u16>,
    pub port_guid: Option<String>,
    pub net_prefix: Option<String>,
    pub has_smi: Option<bool>,
}

impl SysfsPort {
    /// Read everything the driver exposes for `port` of `address`.
    ///
    /// # Errors
    ///
    /// Fails on OS errors other than missing files, or if the `physfn` link does not point to a
    /// PCI address.
    pub fn query<S: FieldSource>(
        source: &S,
        address: PciAddress,
        port: u8,
    ) -> Result<SysfsPort, ProbeError> {
        let dir = device_dir(address);

        let physfn = source.read_link(&format!("{dir}/physfn"))?;
        let parent = match capture(&PHYSFN_TARGET, &physfn) {
            Some(target) => Some(
                target
                    .parse::<PciAddress>()
                    .map_err(|source| ProbeError::Address { text: target, source })?,
            ),
            None => None,
        };

        let numa = non_empty(&source.read_file(&format!("{dir}/numa_node"))?);
        if numa.is_none() {
            warn!("{address} has no NUMA assignment");
        }

        let rdma = source
            .list_dir(&format!("{dir}/infiniband"))?
            .into_iter()
            .next();
        let net = net_for_port(source, &dir, port)?;

        let mut sysfs_port = SysfsPort {
            parent,
            numa,
            rdma: rdma.clone(),
            net,
            port_count: 1,
            ..SysfsPort::default()
        };
        let Some(rdma) = rdma else {
            return Ok(sysfs_port);
        };

        let ib = format!("{dir}/infiniband/{rdma}");
        let ports = format!("{ib}/ports/{port}");
        let read = |path: &str| -> Result<Option<String>, ProbeError> {
            Ok(non_empty(&source.read_file(path)?))
        };

        sysfs_port.hca_type = read(&format!("{ib}/hca_type"))?;
        sysfs_port.firmware = read(&format!("{ib}/fw_ver"))?;
        sysfs_port.port_count = u8::try_from(source.list_dir(&format!("{ib}/ports"))?.len())
            .unwrap_or(u8::MAX)
            .max(1);
        sysfs_port.state = read(&format!("{ports}/state"))?.map(|state| PortState::from_sysfs(&state));
        sysfs_port.link_layer =
            read(&format!("{ports}/link_layer"))?.map(|layer| LinkLayer::from_sysfs(&layer));
        sysfs_port.rate = read(&format!("{ports}/rate"))?.and_then(|rate| capture(&LEADING_NUMBER, &rate));
        sysfs_port.lid = read(&format!("{ports}/lid"))?.and_then(|lid| parse_hex(&lid));
        sysfs_port.sm_lid = read(&format!("{ports}/sm_lid"))?.and_then(|lid| parse_hex(&lid));
        if let Some(gid) = read(&format!("{ports}/gids/0"))? {
            sysfs_port.net_prefix = capture(&GID_PREFIX, &gid).map(|prefix| strip_colons(&prefix));
            sysfs_port.port_guid = capture(&GID_GUID, &gid).map(|guid| strip_colons(&guid));
        }
        sysfs_port.has_smi = match read(&format!("{ports}/has_smi"))?.as_deref() {
            Some("1") => Some(true),
            Some("0") => Some(false),
            _ => None,
        };
        Ok(sysfs_port)
    }
}

/// Find the network interface serving `port`.
///
/// mlx4 reports the port in `dev_port` (decimal), mlx5 in `dev_id` (hex); the larger of the two
/// plus one is the channel adapter port, as `ibdev2netdev` does it.
fn net_for_port<S: FieldSource>(source: &S, dir: &str, port: u8) -> Result<Option<String>, ProbeError> {
    for net in source.list_dir(&format!("{dir}/net"))? {
        let dev_id = parse_hex(&source.read_file(&format!("{dir}/net/{net}/dev_id"))?).unwrap_or(0);
        let dev_port = source
            .read_file(&format!("{dir}/net/{net}/dev_port"))?
            .trim()
            .parse::<u16>()
            .unwrap_or(0);
        if u32::from(dev_id.max(dev_port)) + 1 == u32::from(port) {
            return Ok(Some(net));
        }
    }
    Ok(None)
}

fn parse_hex(text: &str) -> Option<u16> {
    let text = text.trim();
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u16::from_str_radix(digits, 16).ok()
}

fn strip_colons(text: &str) -> String {
    text.replace(':', "").to_lowercase()
}

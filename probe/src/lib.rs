// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Builds [`DeviceRecord`]s from what the host tells about its Mellanox functions.
//!
//! Every query goes through a [`FieldSource`], so the probe runs the same way against the live
//! host, a recorder wrapping it, or canned test data.

#![deny(clippy::pedantic, clippy::unwrap_used)]

pub mod lspci;
pub mod mst;
pub mod port;
pub mod roce;
pub mod saquery;
pub(crate) mod scrape;
pub mod tools;

use hardware::field::View;
use hardware::nic::{FunctionKind, LinkLayer};
use hardware::pci::{InvalidPciAddress, PciAddress};
use hardware::{DeviceRecord, DeviceRecordBuilder, DeviceRecordBuilderError};
use lspci::PciDetails;
use mst::MstStatus;
use port::SysfsPort;
use saquery::FabricInfo;
use sysfs::{FieldSource, SourceError};
use tracing::{debug, trace};

pub use roce::LosslessBaseline;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("'{text}' is not a PCI address")]
    Address {
        text: String,
        #[source]
        source: InvalidPciAddress,
    },
    #[error("inconsistent data for {address}")]
    Record {
        address: PciAddress,
        #[source]
        source: DeviceRecordBuilderError,
    },
}

/// What to probe for.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProbeConfig {
    /// RoCE settings are only collected for [`View::Roce`].
    pub view: View,
    /// Query `mst` for device paths.
    pub mst: bool,
    /// Query the subnet administrator for switch and subnet manager identity.
    pub saquery: bool,
    pub lossless: LosslessBaseline,
}

/// Set every builder field whose value is known.
macro_rules! set_known {
    ($builder:ident $(.$field:ident($value:expr))+) => {
        $(
            if let Some(value) = $value {
                $builder.$field(value);
            }
        )+
    };
}

/// Probe every network function of the vendor, one record per function and port, in `lspci`
/// order.
///
/// # Errors
///
/// Fails if a data source can not be queried or returns data which can not describe a device.
pub fn discover<S: FieldSource>(
    source: &S,
    config: &ProbeConfig,
) -> Result<Vec<DeviceRecord>, ProbeError> {
    let addresses = lspci::enumerate(source)?;
    debug!("probing {} functions", addresses.len());
    let mst = if config.mst {
        MstStatus::load(source, &addresses)?
    } else {
        None
    };

    let mut devices = Vec::with_capacity(addresses.len());
    for address in addresses {
        let mut port = 1;
        loop {
            let device = probe_port(source, config, mst.as_ref(), address, port)?;
            let port_count = device.port_count();
            devices.push(device);
            if port >= port_count {
                break;
            }
            port += 1;
        }
    }
    Ok(devices)
}

fn probe_port<S: FieldSource>(
    source: &S,
    config: &ProbeConfig,
    mst: Option<&MstStatus>,
    address: PciAddress,
    port: u8,
) -> Result<DeviceRecord, ProbeError> {
    trace!("probing {address} port {port}");
    let sysfs = SysfsPort::query(source, address, port)?;
    let pci = PciDetails::query(source, address)?;
    let kind = if sysfs.parent.is_some() {
        FunctionKind::Virtual
    } else {
        FunctionKind::Physical
    };

    let mut builder = DeviceRecordBuilder::default();
    builder
        .address(address)
        .kind(kind)
        .port(port)
        .port_count(sysfs.port_count);
    set_known!(builder
        .parent(sysfs.parent)
        .numa(sysfs.numa)
        .net(sysfs.net.clone())
        .rdma(sysfs.rdma.clone())
        .hca_type(sysfs.hca_type)
        .firmware(sysfs.firmware)
        .state(sysfs.state)
        .link_layer(sysfs.link_layer.clone())
        .rate(sysfs.rate)
        .lid(sysfs.lid)
        .sm_lid(sysfs.sm_lid)
        .port_guid(sysfs.port_guid)
        .net_prefix(sysfs.net_prefix)
        .has_smi(sysfs.has_smi)
        .description(pci.description)
        .serial(pci.serial)
        .part_number(pci.part_number)
        .revision(pci.revision)
        .lnk_cap_width(pci.lnk_cap_width)
        .lnk_sta_width(pci.lnk_sta_width)
        .pci_gen(pci.pci_gen)
        .mst_device(mst.and_then(|status| status.device(address))));

    if let Some(rdma) = sysfs.rdma.as_deref() {
        set_known!(builder.temperature(tools::temperature(source, rdma)?));

        if config.saquery {
            if let (Some(lid), Some(sm_lid)) = (sysfs.lid, sysfs.sm_lid) {
                let fabric = FabricInfo::query(source, rdma, port, lid, sm_lid)?;
                set_known!(builder
                    .sw_guid(fabric.sw_guid)
                    .sw_description(fabric.sw_description)
                    .sm_guid(fabric.sm_guid));
            }
        }

        if config.view.is_roce() {
            if let Some(net) = sysfs.net.as_deref() {
                let operstate = source.read_file(&format!("/sys/class/net/{net}/operstate"))?;
                set_known!(builder.operstate(scrape::non_empty(&operstate)));
            }
            if sysfs.link_layer == Some(LinkLayer::Ethernet) {
                let status = roce::roce_status(
                    source,
                    &port::device_dir(address),
                    rdma,
                    sysfs.net.as_deref(),
                    &config.lossless,
                )?;
                builder.roce(status);
            }
        }
    }

    builder
        .build()
        .map_err(|source| ProbeError::Record { address, source })
}

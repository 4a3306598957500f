// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Per-function HCA device records.

use crate::adapter::AdapterKey;
use crate::field::{Cell, Field, Mark};
use crate::nic::{FunctionKind, LinkLayer, PortState, RoceStatus, VirtualHca};
use crate::pci::PciAddress;
use derive_builder::Builder;
use regex::Regex;
use std::sync::LazyLock;

static VIRTUAL_FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[Vv]irtual [Ff]unction").expect("invalid virtual function pattern"));

/// Everything known about one logical port of one PCI function.
///
/// A record is built once per `(address, port)` pair by the probe and never changes afterwards.
/// Values which no data source could provide are `None` and show up as
/// [`NOT_AVAILABLE`](crate::field::NOT_AVAILABLE) in reports.
#[derive(Builder, Clone, Debug, Eq, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct DeviceRecord {
    address: PciAddress,
    kind: FunctionKind,
    /// The physical function owning this virtual function.
    #[builder(setter(strip_option), default)]
    parent: Option<PciAddress>,
    /// 1-based channel adapter port.
    #[builder(default = 1)]
    port: u8,
    /// Number of channel adapter ports this function exposes.
    #[builder(default = 1)]
    port_count: u8,
    #[builder(setter(into, strip_option), default)]
    serial: Option<String>,
    #[builder(setter(into, strip_option), default)]
    part_number: Option<String>,
    #[builder(setter(into, strip_option), default)]
    revision: Option<String>,
    #[builder(setter(into, strip_option), default)]
    firmware: Option<String>,
    #[builder(setter(into, strip_option), default)]
    description: Option<String>,
    #[builder(setter(into, strip_option), default)]
    numa: Option<String>,
    #[builder(setter(into, strip_option), default)]
    net: Option<String>,
    #[builder(setter(into, strip_option), default)]
    rdma: Option<String>,
    #[builder(setter(into, strip_option), default)]
    hca_type: Option<String>,
    #[builder(setter(strip_option), default)]
    state: Option<PortState>,
    #[builder(setter(strip_option), default)]
    link_layer: Option<LinkLayer>,
    #[builder(setter(into, strip_option), default)]
    rate: Option<String>,
    /// PCIe lanes the card asks for.
    #[builder(setter(strip_option), default)]
    lnk_cap_width: Option<u8>,
    /// PCIe lanes the slot negotiated.
    #[builder(setter(strip_option), default)]
    lnk_sta_width: Option<u8>,
    #[builder(setter(strip_option), default)]
    pci_gen: Option<u8>,
    #[builder(setter(strip_option), default)]
    lid: Option<u16>,
    #[builder(setter(strip_option), default)]
    sm_lid: Option<u16>,
    #[builder(setter(into, strip_option), default)]
    port_guid: Option<String>,
    #[builder(setter(into, strip_option), default)]
    net_prefix: Option<String>,
    #[builder(setter(strip_option), default)]
    has_smi: Option<bool>,
    #[builder(setter(into, strip_option), default)]
    sm_guid: Option<String>,
    #[builder(setter(into, strip_option), default)]
    sw_guid: Option<String>,
    #[builder(setter(into, strip_option), default)]
    sw_description: Option<String>,
    #[builder(setter(into, strip_option), default)]
    operstate: Option<String>,
    #[builder(setter(strip_option), default)]
    roce: Option<RoceStatus>,
    #[builder(setter(strip_option), default)]
    temperature: Option<i32>,
    #[builder(setter(into, strip_option), default)]
    mst_device: Option<String>,
}

impl DeviceRecordBuilder {
    fn validate(&self) -> Result<(), String> {
        match (self.kind, self.parent.flatten()) {
            (Some(FunctionKind::Virtual), None) => {
                return Err("a virtual function needs a parent address".to_string());
            }
            (Some(FunctionKind::Physical), Some(parent)) => {
                return Err(format!("a physical function can not have a parent ({parent})"));
            }
            _ => {}
        }
        if self.port == Some(0) {
            return Err("ports are numbered from 1".to_string());
        }
        Ok(())
    }
}

impl DeviceRecord {
    #[must_use]
    pub fn address(&self) -> PciAddress {
        self.address
    }

    #[must_use]
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    #[must_use]
    pub fn parent(&self) -> Option<PciAddress> {
        self.parent
    }

    #[must_use]
    pub fn port(&self) -> u8 {
        self.port
    }

    #[must_use]
    pub fn port_count(&self) -> u8 {
        self.port_count
    }

    #[must_use]
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// Part number, with the engineering change level appended when known.
    #[must_use]
    pub fn part_number(&self) -> Option<String> {
        let part_number = self.part_number.as_deref()?;
        Some(match &self.revision {
            Some(revision) => format!("{part_number}  rev. {revision}"),
            None => part_number.to_string(),
        })
    }

    #[must_use]
    pub fn firmware(&self) -> Option<&str> {
        self.firmware.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn rdma(&self) -> Option<&str> {
        self.rdma.as_deref()
    }

    #[must_use]
    pub fn net(&self) -> Option<&str> {
        self.net.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> Option<&PortState> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn link_layer(&self) -> Option<&LinkLayer> {
        self.link_layer.as_ref()
    }

    #[must_use]
    pub fn temperature(&self) -> Option<i32> {
        self.temperature
    }

    /// A physical function whose lspci description claims it is a virtual function.
    #[must_use]
    pub fn suspect_virtual(&self) -> bool {
        self.kind.is_physical()
            && self
                .description
                .as_deref()
                .is_some_and(|description| VIRTUAL_FUNCTION.is_match(description))
    }

    /// The card asks for more PCIe lanes than the slot provides.
    #[must_use]
    pub fn lane_mismatch(&self) -> bool {
        matches!((self.lnk_cap_width, self.lnk_sta_width), (Some(cap), Some(sta)) if cap > sta)
    }

    /// Virtual HCA flag, only meaningful on InfiniBand ports.
    #[must_use]
    pub fn virtual_hca(&self) -> Option<VirtualHca> {
        if self.link_layer != Some(LinkLayer::Infiniband) {
            return None;
        }
        self.has_smi.map(|has_smi| {
            if has_smi {
                VirtualHca::Physical
            } else {
                VirtualHca::Virtual
            }
        })
    }

    /// Identity of the physical card this function lives on.
    ///
    /// Cards are identified by their serial number.  When the serial number can not be read (VPD
    /// access usually requires root) the PCI slot is used instead.
    #[must_use]
    pub fn adapter_key(&self) -> AdapterKey {
        match &self.serial {
            Some(serial) => AdapterKey::Serial(serial.clone()),
            None => AdapterKey::Slot(self.address.slot()),
        }
    }

    /// The value of a device scoped field, or `None` for adapter scoped fields.
    #[must_use]
    pub fn cell(&self, field: Field) -> Option<Cell> {
        let cell = match field {
            Field::Sriov => Cell::new(self.kind.to_string()).mark_if(self.suspect_virtual(), Mark::Warning),
            Field::Numa => Cell::from_option(self.numa.as_ref()),
            Field::PciAddr => Cell::new(self.address.to_string()),
            Field::ParentAddr => match self.parent {
                Some(parent) => Cell::new(parent.to_string()),
                None => Cell::new("-"),
            },
            Field::Rdma => Cell::from_option(self.rdma.as_ref()),
            Field::Net => Cell::from_option(self.net.as_ref()),
            Field::HcaType => Cell::from_option(self.hca_type.as_ref()),
            Field::State => Cell::from_option(self.state.as_ref()),
            Field::Rate => Cell::from_option(self.rate.as_ref())
                .mark_if(self.state == Some(PortState::Down), Mark::Warning),
            Field::Port => Cell::new(self.port.to_string()),
            Field::Link => Cell::from_option(self.link_layer.as_ref()),
            Field::MstDevice => Cell::from_option(self.mst_device.as_ref()),
            Field::LnkCapWidth => Cell::from_option(self.lnk_cap_width.map(|width| match self.pci_gen {
                Some(generation) => format!("x{width} G{generation}"),
                None => format!("x{width}"),
            })),
            Field::LnkStaWidth => Cell::from_option(self.lnk_sta_width.map(|width| format!("x{width}")))
                .mark_if(self.lane_mismatch(), Mark::Error),
            Field::PLid => Cell::from_option(self.lid),
            Field::PGuid => Cell::from_option(self.port_guid.as_ref()),
            Field::IbNetPref => Cell::from_option(self.net_prefix.as_ref()),
            Field::SmGuid => Cell::from_option(self.sm_guid.as_ref()),
            Field::SwGuid => Cell::from_option(self.sw_guid.as_ref()),
            Field::SwDescription => Cell::from_option(self.sw_description.as_ref()),
            Field::VrtHca => Cell::from_option(self.virtual_hca()),
            Field::Operstate => Cell::from_option(self.operstate.as_ref()),
            Field::RoceStat => Cell::from_option(self.roce)
                .mark_if(self.roce.is_some_and(|status| status.is_lossy()), Mark::Warning),
            Field::Dev
            | Field::Desc
            | Field::PartNumber
            | Field::SerialNumber
            | Field::Firmware
            | Field::Tempr => return None,
        };
        Some(cell)
    }

    /// `sm_lid` of this port, needed to query the subnet manager.
    #[must_use]
    pub fn sm_lid(&self) -> Option<u16> {
        self.sm_lid
    }

    #[must_use]
    pub fn lid(&self) -> Option<u16> {
        self.lid
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The report field registry.
//!
//! Records are strongly typed structs; [`Field`] is the finite set of names under which their
//! values are exposed to the report layer.  Each field belongs either to the adapter summary
//! ([`FieldScope::Adapter`]) or to the per-function device rows ([`FieldScope::Device`]).

use std::fmt::{Display, Formatter};

/// Text shown for a value which none of the data sources could provide.
pub const NOT_AVAILABLE: &str = "=N/A=";

/// Every field the report knows about, named as it appears in the report header.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::VariantNames,
)]
pub enum Field {
    // adapter summary
    Dev,
    Desc,
    #[strum(serialize = "PN")]
    PartNumber,
    #[strum(serialize = "SN")]
    SerialNumber,
    #[strum(serialize = "FW")]
    Firmware,
    Tempr,
    // device rows
    #[strum(serialize = "SRIOV")]
    Sriov,
    Numa,
    #[strum(serialize = "PCI_addr")]
    PciAddr,
    #[strum(serialize = "Parent_addr")]
    ParentAddr,
    #[strum(serialize = "RDMA")]
    Rdma,
    Net,
    #[strum(serialize = "HCA_Type")]
    HcaType,
    State,
    Rate,
    Port,
    Link,
    #[strum(serialize = "MST_device")]
    MstDevice,
    LnkCapWidth,
    LnkStaWidth,
    PLid,
    PGuid,
    IbNetPref,
    #[strum(serialize = "SMGuid")]
    SmGuid,
    SwGuid,
    SwDescription,
    #[strum(serialize = "VrtHCA")]
    VrtHca,
    Operstate,
    #[strum(serialize = "RoCEstat")]
    RoceStat,
}

/// Which part of a report item carries a [`Field`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::EnumIs)]
pub enum FieldScope {
    Adapter,
    Device,
}

impl Field {
    #[must_use]
    pub fn scope(self) -> FieldScope {
        match self {
            Field::Dev
            | Field::Desc
            | Field::PartNumber
            | Field::SerialNumber
            | Field::Firmware
            | Field::Tempr => FieldScope::Adapter,
            _ => FieldScope::Device,
        }
    }

    /// The field name as printed in report headers.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// One line of help text for the extended field description.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Field::Dev => "Device number. Enumerated value padded with #",
            Field::Desc => "HCA description as appears in lspci output",
            Field::PartNumber => "HCA part number including revision",
            Field::SerialNumber => "HCA serial number",
            Field::Firmware => "HCA currently running firmware version",
            Field::Tempr => "HCA temperature. Based on mget_temp utility from MFT",
            Field::Sriov => "SRIOV function type: PF (physical function) or VF (virtual function)",
            Field::Numa => "NUMA affinity",
            Field::PciAddr => "PCI address (BDF)",
            Field::ParentAddr => "BDF address of the SRIOV parent physical function of a virtual function",
            Field::Rdma => "Channel adapter name (ca_name)",
            Field::Net => "Network interface name, as appears in \"ip link show\"",
            Field::HcaType => "Channel adapter type, as appears in \"ibstat\"",
            Field::State => "Port state: actv (active), init (initializing) or down",
            Field::Rate => "Link rate in Gbit/s",
            Field::Port => "Channel adapter port (ca_port, not related to the physical port)",
            Field::Link => "Link type: IB (InfiniBand) or Eth (Ethernet)",
            Field::MstDevice => "MST device path",
            Field::LnkCapWidth => "PCI width capability and generation. Number of PCI lanes required by the HCA",
            Field::LnkStaWidth => "PCI width status. Number of PCI lanes available to the HCA in its current slot",
            Field::PLid => "Port LID",
            Field::PGuid => "Port GUID",
            Field::IbNetPref => "IB network prefix",
            Field::SmGuid => "OpenSM GUID",
            Field::SwGuid => "Switch GUID",
            Field::SwDescription => "Switch description, as appears in \"ibnetdiscover\"",
            Field::VrtHca => "Virtual HCA port: Phys (physical HCA port, can run openSM) or Virt",
            Field::Operstate => "Operational state of the network interface",
            Field::RoceStat => "RoCE status: Lossless or Lossy port configuration",
        }
    }
}

/// Report flavours, each with its own default set of columns.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    strum::Display,
    strum::EnumIs,
    strum::EnumIter,
    strum::EnumString,
    strum::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum View {
    #[default]
    System,
    Ib,
    Roce,
}

impl View {
    /// The columns shown by this view when no field selection is given.
    #[must_use]
    pub fn default_order(self) -> Vec<Field> {
        use Field::{
            Desc, Dev, Firmware, HcaType, IbNetPref, Link, LnkCapWidth, LnkStaWidth, Net, Numa,
            Operstate, PGuid, PLid, ParentAddr, PartNumber, PciAddr, Port, Rate, Rdma, RoceStat,
            SerialNumber, Sriov, State, Tempr, VrtHca,
        };
        match self {
            View::System => vec![
                Dev, Desc, PartNumber, SerialNumber, Firmware, PciAddr, Rdma, Net, Port, Numa,
                State, Link, Rate, Sriov, ParentAddr, Tempr, LnkCapWidth, LnkStaWidth, HcaType,
            ],
            View::Ib => vec![
                Dev, Desc, PartNumber, SerialNumber, Firmware, Rdma, Port, Net, Numa, State,
                VrtHca, PLid, PGuid, IbNetPref,
            ],
            View::Roce => vec![
                Dev, Desc, PartNumber, SerialNumber, Firmware, PciAddr, Rdma, Net, Port, Numa,
                State, Operstate, RoceStat,
            ],
        }
    }
}

/// Decoration appended to a value which looks wrong.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum::EnumIs)]
pub enum Mark {
    Warning,
    Error,
}

impl Mark {
    #[must_use]
    pub fn glyph(self) -> &'static str {
        match self {
            Mark::Warning => "*",
            Mark::Error => " >!<",
        }
    }
}

/// One rendered value of a [`Field`].
///
/// The plain text is what filters match against; the mark is only shown when annotations are
/// enabled.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Cell {
    text: String,
    mark: Option<Mark>,
}

impl Cell {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Cell {
        Cell {
            text: text.into(),
            mark: None,
        }
    }

    /// The [`NOT_AVAILABLE`] placeholder.
    #[must_use]
    pub fn absent() -> Cell {
        Cell::new(NOT_AVAILABLE)
    }

    /// A cell for an optional value.
    #[must_use]
    pub fn from_option<T: Display>(value: Option<T>) -> Cell {
        match value {
            Some(value) => Cell::new(value.to_string()),
            None => Cell::absent(),
        }
    }

    /// Attach `mark` when `condition` holds.
    #[must_use]
    pub fn mark_if(mut self, condition: bool, mark: Mark) -> Cell {
        if condition {
            self.mark = Some(mark);
        }
        self
    }

    /// Replace the mark.
    #[must_use]
    pub fn with_mark(mut self, mark: Option<Mark>) -> Cell {
        self.mark = mark;
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn mark(&self) -> Option<Mark> {
        self.mark
    }

    /// Text with the mark glyph (if any) appended.
    #[must_use]
    pub fn annotated(&self) -> String {
        match self.mark {
            Some(mark) => format!("{}{}", self.text, mark.glyph()),
            None => self.text.clone(),
        }
    }
}

impl Display for Cell {
    /// Displays the plain text; see [`Cell::annotated`] for the decorated form.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Adapter temperatures (degrees Celsius) above which `Tempr` is marked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TemperatureThresholds {
    pub warning: i32,
    pub error: i32,
}

impl Default for TemperatureThresholds {
    fn default() -> Self {
        TemperatureThresholds {
            warning: 80,
            error: 90,
        }
    }
}

impl TemperatureThresholds {
    #[must_use]
    pub fn mark(&self, celsius: i32) -> Option<Mark> {
        if celsius > self.error {
            Some(Mark::Error)
        } else if celsius > self.warning {
            Some(Mark::Warning)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn field_names_round_trip() {
        for field in Field::iter() {
            assert_eq!(field.name().parse::<Field>(), Ok(field));
        }
        assert_eq!(Field::PciAddr.to_string(), "PCI_addr");
        assert!("pci_addr".parse::<Field>().is_err());
    }

    #[test]
    fn every_view_starts_with_the_adapter_summary() {
        for view in [View::System, View::Ib, View::Roce] {
            let order = view.default_order();
            assert_eq!(
                &order[..5],
                &[
                    Field::Dev,
                    Field::Desc,
                    Field::PartNumber,
                    Field::SerialNumber,
                    Field::Firmware
                ]
            );
        }
        assert_eq!("roce".parse::<View>(), Ok(View::Roce));
    }

    #[test]
    fn scopes() {
        assert!(Field::Tempr.scope().is_adapter());
        assert!(Field::Sriov.scope().is_device());
    }

    #[test]
    fn temperature_marks() {
        let thresholds = TemperatureThresholds::default();
        assert_eq!(thresholds.mark(80), None);
        assert_eq!(thresholds.mark(81), Some(Mark::Warning));
        assert_eq!(thresholds.mark(90), Some(Mark::Warning));
        assert_eq!(thresholds.mark(91), Some(Mark::Error));
    }

    #[test]
    fn annotation_is_a_suffix() {
        let cell = Cell::new("x8").mark_if(true, Mark::Error);
        assert_eq!(cell.text(), "x8");
        assert_eq!(cell.annotated(), "x8 >!<");
        assert_eq!(Cell::from_option(None::<u8>).annotated(), NOT_AVAILABLE);
    }
}

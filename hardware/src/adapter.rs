// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Physical adapter (card) records.

use crate::device::DeviceRecord;
use crate::field::{Cell, Field, TemperatureThresholds};
use crate::pci::PciAddress;
use crate::topology::TopologyError;
use std::fmt::{Display, Formatter};

/// What makes two physical functions part of the same card.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum AdapterKey {
    /// VPD serial number.
    Serial(String),
    /// PCI slot (function 0 address), used when the serial number is unavailable.
    Slot(PciAddress),
}

impl Display for AdapterKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterKey::Serial(serial) => write!(f, "SN {serial}"),
            AdapterKey::Slot(slot) => write!(f, "slot {slot}"),
        }
    }
}

/// One physical card and the functions it exposes.
///
/// The first device is always the physical function which founded the record.  Further physical
/// functions follow in discovery order, and every virtual function sits right after the run of
/// records belonging to its parent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AdapterRecord {
    index: usize,
    key: AdapterKey,
    devices: Vec<DeviceRecord>,
}

impl AdapterRecord {
    /// Start a new adapter from its first physical function.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::NotPhysicalFunction`] if `founder` is a virtual function.
    pub fn new(index: usize, founder: DeviceRecord) -> Result<AdapterRecord, TopologyError> {
        if !founder.kind().is_physical() {
            return Err(TopologyError::NotPhysicalFunction(founder.address()));
        }
        Ok(AdapterRecord {
            index,
            key: founder.adapter_key(),
            devices: vec![founder],
        })
    }

    /// Attach another function of this card.
    ///
    /// Physical functions are appended.  A virtual function is inserted after its parent and any
    /// virtual functions of that parent which are already attached.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::OrphanVirtualFunction`] if a virtual function's parent is not part
    /// of this adapter.
    pub fn add_device(&mut self, device: DeviceRecord) -> Result<(), TopologyError> {
        let Some(parent) = device.parent() else {
            self.devices.push(device);
            return Ok(());
        };
        let last_of_family = self.devices.iter().rposition(|candidate| {
            candidate.address() == parent || candidate.parent() == Some(parent)
        });
        match last_of_family {
            Some(position) if self.devices[..=position].iter().any(|d| d.address() == parent) => {
                self.devices.insert(position + 1, device);
                Ok(())
            }
            _ => Err(TopologyError::OrphanVirtualFunction {
                function: device.address(),
                parent,
            }),
        }
    }

    /// 1-based display index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn key(&self) -> &AdapterKey {
        &self.key
    }

    #[must_use]
    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    /// The physical function this record was created from.
    #[must_use]
    pub fn founder(&self) -> &DeviceRecord {
        &self.devices[0]
    }

    /// The value of an adapter scoped field, or `None` for device scoped fields.
    ///
    /// Card wide values are taken from the founding physical function.
    #[must_use]
    pub fn cell(&self, field: Field, thresholds: &TemperatureThresholds) -> Option<Cell> {
        let founder = self.founder();
        let cell = match field {
            Field::Dev => Cell::new(format!("#{}", self.index)),
            Field::Desc => Cell::from_option(founder.description()),
            Field::PartNumber => Cell::from_option(founder.part_number()),
            Field::SerialNumber => Cell::from_option(founder.serial()),
            Field::Firmware => Cell::from_option(founder.firmware()),
            Field::Tempr => match founder.temperature() {
                Some(celsius) => Cell::new(celsius.to_string()).with_mark(thresholds.mark(celsius)),
                None => Cell::absent(),
            },
            _ => return None,
        };
        Some(cell)
    }
}

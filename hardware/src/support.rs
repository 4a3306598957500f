// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Terse record constructors for tests.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use crate::device::{DeviceRecord, DeviceRecordBuilder};
use crate::nic::FunctionKind;

/// Port `port` of physical function `address` on the card with serial number `serial`.
#[must_use]
pub fn pf_port(address: &str, serial: &str, port: u8) -> DeviceRecord {
    DeviceRecordBuilder::default()
        .address(address.parse().unwrap())
        .kind(FunctionKind::Physical)
        .serial(serial)
        .port(port)
        .build()
        .unwrap()
}

/// Port 1 of physical function `address` on the card with serial number `serial`.
#[must_use]
pub fn pf(address: &str, serial: &str) -> DeviceRecord {
    pf_port(address, serial, 1)
}

/// Virtual function `address` of the physical function `parent`.
#[must_use]
pub fn vf(address: &str, parent: &str) -> DeviceRecord {
    DeviceRecordBuilder::default()
        .address(address.parse().unwrap())
        .kind(FunctionKind::Virtual)
        .parent(parent.parse().unwrap())
        .build()
        .unwrap()
}

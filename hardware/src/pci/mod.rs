// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PCI addressing primitives.

pub mod address;
pub mod vendor;

pub use address::{InvalidPciAddress, PciAddress};
pub use vendor::VendorId;

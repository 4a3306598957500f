// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors
//
// # HCA inventory model

//! The `hardware` crate holds the data model of the HCA inventory: one [`DeviceRecord`] per
//! PCI function and logical port, grouped into one [`AdapterRecord`] per physical card.
//!
//! ## Overview
//!
//! A single Mellanox card may show up on the PCI bus several times:
//!
//! - **Multi-port functions**: one PCI function exposing more than one channel adapter port
//!   (typical of mlx4 cards) yields one device record per port.
//! - **Multi-function cards**: dual-port mlx5 cards expose one physical function per port,
//!   all sharing the card's VPD serial number.
//! - **SR-IOV**: each physical function may own any number of virtual functions.
//!
//! [`topology::assemble`] turns the flat list of device records back into cards.
//!
//! ## Reporting
//!
//! Records are strongly typed.  The [`field`] module maps them onto the named report columns
//! (`PCI_addr`, `State`, `Tempr`, ...) and computes the warning and error marks attached to
//! suspicious values.
//!
//! ## Features
//!
//! - `testing`: exposes the [`support`] constructors used by tests of downstream crates.

#![deny(clippy::pedantic, clippy::unwrap_used)]

pub mod adapter;
pub mod device;
pub mod field;
pub mod nic;
pub mod pci;
pub mod topology;

#[cfg(any(test, feature = "testing"))]
pub mod support;

pub use adapter::{AdapterKey, AdapterRecord};
pub use device::{DeviceRecord, DeviceRecordBuilder, DeviceRecordBuilderError};

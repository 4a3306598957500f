// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PCI vendor selection for `lspci`.

use std::fmt::{Display, Formatter};

/// The vendor half of a PCI `vendor:device` id.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct VendorId(u16);

impl VendorId {
    /// Mellanox Technologies, now NVIDIA networking.
    pub const MELLANOX: VendorId = VendorId(0x15b3);

    /// The `lspci -d` selector matching every device of this vendor.
    ///
    /// ```
    /// use lshca_hardware::pci::vendor::VendorId;
    ///
    /// assert_eq!(VendorId::MELLANOX.lspci_filter(), "15b3:");
    /// ```
    #[must_use]
    pub fn lspci_filter(self) -> String {
        format!("{self}:")
    }
}

impl Display for VendorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PCI bus addresses.
//!
//! A [`PciAddress`] identifies one PCI function on the host: the
//! `domain:bus:device.function` tuple printed by `lspci -D` and used as the
//! directory name under `/sys/bus/pci/devices`.
//!
//! # Examples
//!
//! ```
//! use lshca_hardware::pci::address::PciAddress;
//!
//! let address: PciAddress = "0000:3b:00.1".parse().unwrap();
//! assert_eq!(address.bus(), 0x3b);
//! assert_eq!(address.function(), 1);
//! assert_eq!(address.to_string(), "0000:3b:00.1");
//! assert_eq!(address.short().to_string(), "3b:00.1");
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A PCI `domain:bus:device.function` address.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PciAddress {
    domain: u16,
    bus: u8,
    device: u8,
    function: u8,
}

/// Errors which may occur when building or parsing a [`PciAddress`].
#[derive(Debug, thiserror::Error)]
pub enum InvalidPciAddress {
    /// The text does not look like a PCI address at all.
    #[error("invalid pci address syntax: \"{0}\"")]
    Syntax(String),
    /// One of the hexadecimal components failed to parse.
    #[error("invalid pci address component \"{0}\": {1}")]
    Component(String, std::num::ParseIntError),
    /// Device numbers are 5 bits wide.
    #[error("pci device number {0:#x} is too large (max is 0x1f)")]
    DeviceTooLarge(u8),
    /// Function numbers are 3 bits wide.
    #[error("pci function number {0} is too large (max is 7)")]
    FunctionTooLarge(u8),
}

impl PciAddress {
    /// Maximum legal device number.
    pub const MAX_DEVICE: u8 = 0x1f;
    /// Maximum legal function number.
    pub const MAX_FUNCTION: u8 = 0b111;

    /// Build an address from its components.
    ///
    /// # Errors
    ///
    /// Returns an error if the device or function number is out of range.
    pub fn new(domain: u16, bus: u8, device: u8, function: u8) -> Result<Self, InvalidPciAddress> {
        if device > Self::MAX_DEVICE {
            return Err(InvalidPciAddress::DeviceTooLarge(device));
        }
        if function > Self::MAX_FUNCTION {
            return Err(InvalidPciAddress::FunctionTooLarge(function));
        }
        Ok(Self {
            domain,
            bus,
            device,
            function,
        })
    }

    #[must_use]
    pub fn domain(self) -> u16 {
        self.domain
    }

    #[must_use]
    pub fn bus(self) -> u8 {
        self.bus
    }

    #[must_use]
    pub fn device(self) -> u8 {
        self.device
    }

    #[must_use]
    pub fn function(self) -> u8 {
        self.function
    }

    /// The address of function 0 in the same slot.
    ///
    /// All functions of one slot belong to the same physical card, which makes this a usable
    /// identity for a card whose serial number can not be read.
    #[must_use]
    pub fn slot(self) -> PciAddress {
        PciAddress {
            function: 0,
            ..self
        }
    }

    /// Display adapter which omits the domain (`bus:device.function`).
    ///
    /// Some vendor tools print short addresses when every device lives in domain `0000`.
    #[must_use]
    pub fn short(self) -> ShortPciAddress {
        ShortPciAddress(self)
    }
}

/// See [`PciAddress::short`].
#[derive(Clone, Copy, Debug)]
pub struct ShortPciAddress(PciAddress);

impl Display for ShortPciAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02x}:{:02x}.{:x}", self.0.bus, self.0.device, self.0.function)
    }
}

impl Display for PciAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}:{}", self.domain, self.short())
    }
}

fn hex<T>(
    text: &str,
    parse: fn(&str, u32) -> Result<T, std::num::ParseIntError>,
) -> Result<T, InvalidPciAddress> {
    parse(text, 16).map_err(|e| InvalidPciAddress::Component(text.to_string(), e))
}

impl FromStr for PciAddress {
    type Err = InvalidPciAddress;

    /// Parses both the long (`0000:01:00.0`) and the short (`01:00.0`) form.
    /// The short form implies domain `0000`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let syntax = || InvalidPciAddress::Syntax(input.to_string());
        let (head, function) = input.rsplit_once('.').ok_or_else(syntax)?;
        let parts: Vec<&str> = head.split(':').collect();
        let (domain, bus, device) = match parts.as_slice() {
            [domain, bus, device] => (hex(domain, u16::from_str_radix)?, *bus, *device),
            [bus, device] => (0, *bus, *device),
            _ => return Err(syntax()),
        };
        if bus.len() > 2 || device.len() > 2 || function.len() != 1 {
            return Err(syntax());
        }
        PciAddress::new(
            domain,
            hex(bus, u8::from_str_radix)?,
            hex(device, u8::from_str_radix)?,
            hex(function, u8::from_str_radix)?,
        )
    }
}

impl TryFrom<&str> for PciAddress {
    type Error = InvalidPciAddress;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;

    #[test]
    fn parse_long_form() {
        let address: PciAddress = "0000:af:1f.7".parse().unwrap();
        assert_eq!(address, PciAddress::new(0, 0xaf, 0x1f, 7).unwrap());
        assert_eq!(address.to_string(), "0000:af:1f.7");
    }

    #[test]
    fn parse_short_form_implies_domain_zero() {
        let address: PciAddress = "81:00.1".parse().unwrap();
        assert_eq!(address.domain(), 0);
        assert_eq!(address.to_string(), "0000:81:00.1");
    }

    #[test]
    fn out_of_range_components_are_rejected() {
        assert!(matches!(
            "0000:01:20.0".parse::<PciAddress>(),
            Err(InvalidPciAddress::DeviceTooLarge(0x20))
        ));
        assert!(matches!(
            "0000:01:00.8".parse::<PciAddress>(),
            Err(InvalidPciAddress::FunctionTooLarge(8))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        for bad in ["", "0000:01:00", "zz:00.0", "0000:01:00.10", "1:2:3:4.0"] {
            assert!(bad.parse::<PciAddress>().is_err(), "{bad} parsed");
        }
    }

    #[test]
    fn slot_clears_function() {
        let address: PciAddress = "0000:01:00.3".parse().unwrap();
        assert_eq!(address.slot().to_string(), "0000:01:00.0");
    }

    #[test]
    fn display_round_trip() {
        bolero::check!()
            .with_type()
            .cloned()
            .for_each(|(domain, bus, device, function): (u16, u8, u8, u8)| {
                let Ok(address) = PciAddress::new(domain, bus, device % 32, function % 8) else {
                    panic!("in range components rejected");
                };
                assert_eq!(address.to_string().parse::<PciAddress>().unwrap(), address);
            });
    }
}

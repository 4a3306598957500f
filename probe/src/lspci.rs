// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `lspci` based enumeration and PCI details.

use crate::ProbeError;
use crate::scrape::{capture, capture_in, pattern};
use hardware::pci::{PciAddress, VendorId};
use regex::Regex;
use sysfs::FieldSource;
use tracing::debug;

pattern!(NETWORK_FUNCTION = r"^(\S+) (?:Ethernet|Infini[Bb]and|Network)");
pattern!(SERIAL_LINE = r"\[SN\]");
pattern!(PART_NUMBER_LINE = r"\[PN\]");
pattern!(REVISION_LINE = r"\[EC\]");
pattern!(AFTER_LAST_COLON = r".*:(.+)");
pattern!(LNK_CAP_LINE = r"LnkCap:.*Width");
pattern!(LNK_STA_LINE = r"LnkSta:.*Width");
pattern!(WIDTH = r"Width x([0-9]+)");
pattern!(PCIE_GEN_LINE = r"(?i)pcie *gen[0-9]");
pattern!(PCIE_GEN = r"(?i)pcie *gen([0-9]) ");

/// The command listing every Mellanox PCI function.
#[must_use]
pub fn enumeration_command() -> String {
    format!("lspci -Dd {}", VendorId::MELLANOX.lspci_filter())
}

/// Addresses of the vendor's network functions, in `lspci` order.
///
/// # Errors
///
/// Fails if `lspci` can not be run or prints an address which can not be parsed.
pub fn enumerate<S: FieldSource>(source: &S) -> Result<Vec<PciAddress>, ProbeError> {
    let mut addresses = Vec::new();
    for line in source.run(&enumeration_command(), true)? {
        let Some(address) = capture(&NETWORK_FUNCTION, &line) else {
            debug!("ignoring non network function: {line}");
            continue;
        };
        let address = address
            .parse::<PciAddress>()
            .map_err(|source| ProbeError::Address { text: address, source })?;
        addresses.push(address);
    }
    Ok(addresses)
}

/// What `lspci -vvv` tells about one function.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PciDetails {
    pub description: Option<String>,
    pub serial: Option<String>,
    pub part_number: Option<String>,
    pub revision: Option<String>,
    pub lnk_cap_width: Option<u8>,
    pub lnk_sta_width: Option<u8>,
    pub pci_gen: Option<u8>,
}

impl PciDetails {
    /// Query `lspci -vvvD` for `address`.
    ///
    /// VPD fields (serial and part number) are only visible to root.
    ///
    /// # Errors
    ///
    /// Fails if `lspci` can not be run.
    pub fn query<S: FieldSource>(source: &S, address: PciAddress) -> Result<PciDetails, ProbeError> {
        let lines = source.run(&format!("lspci -vvvD -s {address}"), true)?;
        Ok(PciDetails::parse(&lines, address))
    }

    fn parse(lines: &[String], address: PciAddress) -> PciDetails {
        let bdf = address.to_string();
        let description = lines
            .iter()
            .find(|line| line.starts_with(|c: char| c.is_ascii_digit()))
            .and_then(|line| line.strip_prefix(bdf.as_str()))
            .and_then(|rest| capture(&AFTER_LAST_COLON, rest));
        let width = |search: &Regex| {
            capture_in(lines, search, &WIDTH).and_then(|width| width.parse::<u8>().ok())
        };
        PciDetails {
            description,
            serial: capture_in(lines, &SERIAL_LINE, &AFTER_LAST_COLON),
            part_number: capture_in(lines, &PART_NUMBER_LINE, &AFTER_LAST_COLON),
            revision: capture_in(lines, &REVISION_LINE, &AFTER_LAST_COLON),
            lnk_cap_width: width(&LNK_CAP_LINE),
            lnk_sta_width: width(&LNK_STA_LINE),
            pci_gen: capture_in(lines, &PCIE_GEN_LINE, &PCIE_GEN)
                .and_then(|generation| generation.parse::<u8>().ok()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use sysfs::fixture::FixtureSource;

    const LSPCI: &str = "\
0000:5e:00.0 Infiniband controller: Mellanox Technologies MT28908 Family [ConnectX-6]
\tSubsystem: Mellanox Technologies Device 0028
\tCapabilities: [60] Express (v2) Endpoint, MSI 00
\t\tLnkCap:\tPort #0, Speed 16GT/s, Width x16, ASPM not supported
\t\tLnkSta:\tSpeed 16GT/s (ok), Width x8 (downgraded)
\tCapabilities: [48] Vital Product Data
\t\tProduct Name: ConnectX-6 VPI adapter card, HDR IB (200Gb/s) and 200GbE
\t\tRead-only fields:
\t\t\t[PN] Part number: MCX653105A-HDAT
\t\t\t[EC] Engineering changes: A6
\t\t\t[V2] Vendor specific: MCX653105A-HDAT
\t\t\t[SN] Serial number: MT2014X04321
\t\t\t[V3] Vendor specific: PCIeGen4 x16
\t\t\t[RV] Reserved: checksum good, 1 byte(s) reserved
";

    #[test]
    fn details_from_vpd_and_link_capabilities() {
        let address: PciAddress = "0000:5e:00.0".parse().unwrap();
        let lines: Vec<String> = LSPCI.lines().map(str::to_string).collect();
        assert_eq!(
            PciDetails::parse(&lines, address),
            PciDetails {
                description: Some(
                    "Mellanox Technologies MT28908 Family [ConnectX-6]".to_string()
                ),
                serial: Some("MT2014X04321".to_string()),
                part_number: Some("MCX653105A-HDAT".to_string()),
                revision: Some("A6".to_string()),
                lnk_cap_width: Some(16),
                lnk_sta_width: Some(8),
                pci_gen: Some(4),
            }
        );
    }

    #[test]
    fn without_root_there_is_no_vpd() {
        let address: PciAddress = "0000:5e:00.0".parse().unwrap();
        let lines = vec![LSPCI.lines().next().unwrap().to_string()];
        let details = PciDetails::parse(&lines, address);
        assert!(details.description.is_some());
        assert_eq!(details.serial, None);
        assert_eq!(details.lnk_cap_width, None);
    }

    #[test]
    fn enumeration_keeps_network_functions_only() {
        let source = FixtureSource::default().with_command(
            "lspci -Dd 15b3:",
            [
                "0000:01:00.0 Infiniband controller: Mellanox Technologies MT27800 Family [ConnectX-5]",
                "0000:01:00.1 Ethernet controller: Mellanox Technologies MT27800 Family [ConnectX-5]",
                "0000:02:00.0 PCI bridge: Mellanox Technologies MT43244 Family",
                "0000:03:00.0 Network controller: Mellanox Technologies MT27500 Family [ConnectX-3]",
            ],
        );
        let addresses: Vec<String> = enumerate(&source)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(addresses, vec!["0000:01:00.0", "0000:01:00.1", "0000:03:00.0"]);
    }
}

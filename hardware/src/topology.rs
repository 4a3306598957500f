// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Grouping of device records into physical adapters.

use crate::adapter::{AdapterKey, AdapterRecord};
use crate::device::DeviceRecord;
use crate::pci::PciAddress;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Inconsistencies which make it impossible to build the adapter list.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("virtual function {function} refers to parent {parent}, which is not a known physical function")]
    OrphanVirtualFunction {
        function: PciAddress,
        parent: PciAddress,
    },
    #[error("{0} is not a physical function and can not represent an adapter")]
    NotPhysicalFunction(PciAddress),
}

/// Build the adapter list from every device record found on the host.
///
/// Physical functions are grouped by [`AdapterKey`] first, in discovery order, which also fixes
/// the display index of each adapter.  Virtual functions are then attached to the adapter of
/// their parent, right after the parent and its earlier virtual functions.
///
/// # Errors
///
/// Fails if a virtual function's parent is not among the physical functions in `devices`.
pub fn assemble(devices: Vec<DeviceRecord>) -> Result<Vec<AdapterRecord>, TopologyError> {
    // Built records carry a parent address exactly when they are virtual functions.
    let mut physical = Vec::new();
    let mut virtual_functions = Vec::new();
    for device in devices {
        match device.parent() {
            Some(parent) => virtual_functions.push((parent, device)),
            None => physical.push(device),
        }
    }

    let mut adapters: Vec<AdapterRecord> = Vec::new();
    let mut positions: HashMap<AdapterKey, usize> = HashMap::new();
    let mut owners: HashMap<PciAddress, AdapterKey> = HashMap::new();

    for device in physical {
        let key = device.adapter_key();
        owners.insert(device.address(), key.clone());
        if let Some(&position) = positions.get(&key) {
            trace!("adding {} port {} to adapter #{}", device.address(), device.port(), position + 1);
            adapters[position].add_device(device)?;
        } else {
            let index = adapters.len() + 1;
            debug!("new adapter #{index} ({key}) founded by {}", device.address());
            adapters.push(AdapterRecord::new(index, device)?);
            positions.insert(key, index - 1);
        }
    }

    for (parent, device) in virtual_functions {
        let Some(position) = owners.get(&parent).and_then(|key| positions.get(key)).copied() else {
            return Err(TopologyError::OrphanVirtualFunction {
                function: device.address(),
                parent,
            });
        };
        trace!("attaching virtual function {} to {parent}", device.address());
        adapters[position].add_device(device)?;
    }

    debug!("assembled {} adapter(s)", adapters.len());
    Ok(adapters)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use crate::support::{pf, pf_port, vf};
    use pretty_assertions::assert_eq;

    fn layout(adapters: &[AdapterRecord]) -> Vec<(usize, Vec<String>)> {
        adapters
            .iter()
            .map(|adapter| {
                (
                    adapter.index(),
                    adapter
                        .devices()
                        .iter()
                        .map(|device| format!("{}/{}", device.address(), device.port()))
                        .collect(),
                )
            })
            .collect()
    }

    #[test]
    fn functions_sharing_a_serial_form_one_adapter() {
        let adapters = assemble(vec![
            pf_port("0000:01:00.0", "SN123", 1),
            pf_port("0000:01:00.0", "SN123", 2),
            pf("0000:02:00.0", "SN123"),
        ])
        .unwrap();
        assert_eq!(
            layout(&adapters),
            vec![(
                1,
                vec![
                    "0000:01:00.0/1".to_string(),
                    "0000:01:00.0/2".to_string(),
                    "0000:02:00.0/1".to_string()
                ]
            )]
        );
    }

    #[test]
    fn virtual_function_follows_parent() {
        let adapters = assemble(vec![
            vf("0000:01:00.2", "0000:01:00.0"),
            pf("0000:01:00.0", "SN1"),
            pf("0000:01:00.1", "SN1"),
        ])
        .unwrap();
        assert_eq!(
            layout(&adapters),
            vec![(
                1,
                vec![
                    "0000:01:00.0/1".to_string(),
                    "0000:01:00.2/1".to_string(),
                    "0000:01:00.1/1".to_string()
                ]
            )]
        );
    }

    #[test]
    fn indexes_follow_discovery_order() {
        let adapters = assemble(vec![
            pf("0000:81:00.0", "B"),
            pf("0000:01:00.0", "A"),
            pf("0000:81:00.1", "B"),
        ])
        .unwrap();
        let summary: Vec<_> = adapters
            .iter()
            .map(|adapter| (adapter.index(), adapter.key().clone(), adapter.devices().len()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, AdapterKey::Serial("B".to_string()), 2),
                (2, AdapterKey::Serial("A".to_string()), 1),
            ]
        );
    }

    #[test]
    fn orphan_virtual_function_is_fatal() {
        let result = assemble(vec![pf("0000:01:00.0", "SN1"), vf("0000:01:00.2", "0000:03:00.0")]);
        assert_eq!(
            result,
            Err(TopologyError::OrphanVirtualFunction {
                function: "0000:01:00.2".parse().unwrap(),
                parent: "0000:03:00.0".parse().unwrap(),
            })
        );
    }

    #[test]
    fn empty_host_has_no_adapters() {
        assert_eq!(assemble(vec![]), Ok(vec![]));
    }

    /// Random hosts: each entry is either a physical function of one of four cards or a virtual
    /// function of an earlier physical function.
    #[test]
    fn assembly_invariants() {
        bolero::check!()
            .with_type()
            .cloned()
            .for_each(|entries: Vec<(u8, bool, u8)>| {
                let mut devices = Vec::new();
                let mut physical: Vec<String> = Vec::new();
                for (i, (card, is_virtual, parent)) in entries.iter().take(200).enumerate() {
                    let address = format!("0000:{i:02x}:00.0");
                    if *is_virtual && !physical.is_empty() {
                        let parent = &physical[usize::from(*parent) % physical.len()];
                        devices.push(vf(&format!("0000:{i:02x}:00.1"), parent));
                    } else {
                        devices.push(pf(&address, &format!("SN{}", card % 4)));
                        physical.push(address);
                    }
                }
                let total = devices.len();
                let adapters = assemble(devices).unwrap();

                assert_eq!(
                    adapters.iter().map(|a| a.devices().len()).sum::<usize>(),
                    total
                );
                for (position, adapter) in adapters.iter().enumerate() {
                    assert_eq!(adapter.index(), position + 1);
                    assert!(adapter.founder().kind().is_physical());
                    let devices = adapter.devices();
                    for (at, device) in devices.iter().enumerate() {
                        let Some(parent) = device.parent() else {
                            continue;
                        };
                        let start = devices.iter().position(|d| d.address() == parent).unwrap();
                        assert!(start < at);
                        assert!(devices[start..at]
                            .iter()
                            .all(|d| d.address() == parent || d.parent() == Some(parent)));
                    }
                }
            });
    }
}

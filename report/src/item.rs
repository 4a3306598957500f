// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The unit of work of the report layer.

use hardware::AdapterRecord;
use hardware::field::{Cell, Field, TemperatureThresholds};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// One adapter as the report sees it: the card summary plus one row per device record.
///
/// Items start out with every field and are narrowed down by filtering; they are never
/// re-derived from the records.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReportItem {
    pub hca_info: BTreeMap<Field, Cell>,
    pub bdf_devices: Vec<BTreeMap<Field, Cell>>,
}

impl ReportItem {
    #[must_use]
    pub fn new(adapter: &AdapterRecord, thresholds: &TemperatureThresholds) -> ReportItem {
        let hca_info = Field::iter()
            .filter_map(|field| Some((field, adapter.cell(field, thresholds)?)))
            .collect();
        let bdf_devices = adapter
            .devices()
            .iter()
            .map(|device| {
                Field::iter()
                    .filter_map(|field| Some((field, device.cell(field)?)))
                    .collect()
            })
            .collect();
        ReportItem {
            hca_info,
            bdf_devices,
        }
    }

    /// Remove every field `keep` rejects, from the summary and from every row.
    pub fn retain_fields(&mut self, mut keep: impl FnMut(Field) -> bool) {
        self.hca_info.retain(|field, _| keep(*field));
        for row in &mut self.bdf_devices {
            row.retain(|field, _| keep(*field));
        }
    }
}

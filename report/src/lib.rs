// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Output projection: turns assembled adapters into the final report.
//!
//! [`project`] applies the `field=regex` predicates and then the field selection to
//! [`ReportItem`]s; [`render`] lays them out as an aligned table or serializes them as JSON.

#![deny(clippy::pedantic, clippy::unwrap_used)]

pub mod filter;
pub mod item;
pub mod render;

pub use filter::{FieldSelection, FilterError, WherePredicate, parse_field};
pub use item::ReportItem;
pub use render::{RenderError, RenderMode, render};

use hardware::AdapterRecord;
use hardware::field::TemperatureThresholds;
use tracing::debug;

/// Build the report items of `adapters`, keeping the adapters and rows every predicate accepts
/// and only the selected fields.
///
/// Predicates test the complete data, so a row can be filtered on a field which is not shown.
#[must_use]
pub fn project(
    adapters: &[AdapterRecord],
    selection: &FieldSelection,
    predicates: &[WherePredicate],
    thresholds: &TemperatureThresholds,
) -> Vec<ReportItem> {
    let mut items: Vec<ReportItem> = adapters
        .iter()
        .map(|adapter| ReportItem::new(adapter, thresholds))
        .collect();
    for predicate in predicates {
        predicate.apply(&mut items);
    }
    debug!("{} of {} adapters pass the filters", items.len(), adapters.len());
    for item in &mut items {
        item.retain_fields(|field| selection.contains(field));
    }
    items
}

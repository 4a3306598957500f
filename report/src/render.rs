// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Table and JSON rendering of report items.

use crate::item::ReportItem;
use hardware::field::{Cell, Field};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

const SEPARATOR: char = '-';
const COLUMN_SEPARATOR: &str = " | ";
const SRIOV_INDENT: &str = "  ";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum::Display, strum::EnumIs)]
#[strum(serialize_all = "lowercase")]
pub enum RenderMode {
    /// Aligned text for humans.
    #[default]
    Table,
    /// JSON.
    Structured,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to serialize the report")]
    Serialize(#[from] serde_json::Error),
    #[error("serialized report is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Render `items` with the columns of `field_order` that are still present.
///
/// `annotate` appends warning and error glyphs to marked values; it has no effect on
/// structured output.
///
/// # Errors
///
/// Fails if structured output can not be serialized.
pub fn render(
    items: &[ReportItem],
    mode: RenderMode,
    field_order: &[Field],
    annotate: bool,
) -> Result<String, RenderError> {
    match mode {
        RenderMode::Table => Ok(Table::new(items, field_order, annotate).to_string()),
        RenderMode::Structured => structured(items),
    }
}

#[derive(Serialize)]
struct StructuredItem<'a> {
    bdf_devices: Vec<BTreeMap<&'static str, &'a str>>,
    hca_info: BTreeMap<&'static str, &'a str>,
}

fn plain(cells: &BTreeMap<Field, Cell>) -> BTreeMap<&'static str, &str> {
    cells
        .iter()
        .map(|(field, cell)| (field.name(), cell.text()))
        .collect()
}

fn structured(items: &[ReportItem]) -> Result<String, RenderError> {
    let items: Vec<StructuredItem<'_>> = items
        .iter()
        .map(|item| StructuredItem {
            bdf_devices: item.bdf_devices.iter().map(plain).collect(),
            hca_info: plain(&item.hca_info),
        })
        .collect();
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    items.serialize(&mut serializer)?;
    Ok(String::from_utf8(out)?)
}

/// A laid out table: one block per adapter, all sharing the same column widths.
struct Table {
    adapters: Vec<AdapterBlock>,
    widths: BTreeMap<Field, usize>,
    rule: usize,
}

struct AdapterBlock {
    summary: Vec<(Field, String)>,
    columns: Vec<Field>,
    rows: Vec<Vec<String>>,
}

fn width(text: &str) -> usize {
    text.chars().count()
}

fn cell_text(field: Field, cell: &Cell, annotate: bool) -> String {
    let text = if annotate {
        cell.annotated()
    } else {
        cell.text().to_string()
    };
    if field == Field::Sriov {
        if cell.text() == "PF" {
            format!("{text}{SRIOV_INDENT}")
        } else {
            format!("{SRIOV_INDENT}{text}")
        }
    } else {
        text
    }
}

impl Table {
    fn new(items: &[ReportItem], field_order: &[Field], annotate: bool) -> Table {
        let mut widths: BTreeMap<Field, usize> = BTreeMap::new();
        let mut summary_width = 0;
        let mut adapters = Vec::with_capacity(items.len());

        for item in items {
            let summary: Vec<(Field, String)> = field_order
                .iter()
                .filter_map(|field| {
                    let cell = item.hca_info.get(field)?;
                    Some((*field, cell_text(*field, cell, annotate)))
                })
                .collect();
            summary_width = summary_width.max(
                summary
                    .iter()
                    .map(|(field, value)| width(field.name()) + width(value) + 5)
                    .sum(),
            );

            let columns: Vec<Field> = field_order
                .iter()
                .copied()
                .filter(|field| item.bdf_devices.iter().any(|row| row.contains_key(field)))
                .collect();
            let rows: Vec<Vec<String>> = item
                .bdf_devices
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|field| match row.get(field) {
                            Some(cell) => cell_text(*field, cell, annotate),
                            None => String::new(),
                        })
                        .collect()
                })
                .collect();
            for (at, field) in columns.iter().enumerate() {
                let widest = rows
                    .iter()
                    .map(|row| width(&row[at]))
                    .max()
                    .unwrap_or(0)
                    .max(width(field.name()));
                let entry = widths.entry(*field).or_default();
                *entry = (*entry).max(widest);
            }
            adapters.push(AdapterBlock {
                summary,
                columns,
                rows,
            });
        }

        let device_width = if widths.is_empty() {
            0
        } else {
            widths.values().sum::<usize>() + 3 * widths.len() - 2
        };
        Table {
            adapters,
            widths,
            rule: device_width.max(summary_width),
        }
    }

    fn write_row<'a>(
        &self,
        f: &mut Formatter<'_>,
        columns: &[Field],
        values: impl Iterator<Item = &'a str>,
    ) -> std::fmt::Result {
        let mut first = true;
        for (field, value) in columns.iter().zip(values) {
            if !first {
                f.write_str(COLUMN_SEPARATOR)?;
            }
            first = false;
            let width = self.widths.get(field).copied().unwrap_or(0);
            write!(f, "{value:^width$}")?;
        }
        writeln!(f)
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.adapters.is_empty() {
            return Ok(());
        }
        let rule: String = std::iter::repeat_n(SEPARATOR, self.rule).collect();
        writeln!(f, "{rule}")?;
        for adapter in &self.adapters {
            let summary: Vec<String> = adapter
                .summary
                .iter()
                .map(|(field, value)| match field {
                    Field::Dev => format!("{field} {value}"),
                    _ => format!("{field}: {value}"),
                })
                .collect();
            writeln!(f, "{}", summary.join("   "))?;
            writeln!(f, "{rule}")?;
            if adapter.columns.is_empty() {
                continue;
            }
            self.write_row(f, &adapter.columns, adapter.columns.iter().map(|field| field.name()))?;
            writeln!(f, "{rule}")?;
            for row in &adapter.rows {
                self.write_row(f, &adapter.columns, row.iter().map(String::as_str))?;
            }
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use hardware::DeviceRecordBuilder;
    use hardware::field::TemperatureThresholds;
    use hardware::nic::FunctionKind;
    use hardware::support::{pf, vf};
    use hardware::topology::assemble;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn items(devices: Vec<hardware::DeviceRecord>) -> Vec<ReportItem> {
        assemble(devices)
            .unwrap()
            .iter()
            .map(|adapter| ReportItem::new(adapter, &TemperatureThresholds::default()))
            .collect()
    }

    #[test]
    fn table_layout() {
        let items = items(vec![pf("0000:01:00.0", "SN1"), vf("0000:01:00.2", "0000:01:00.0")]);
        let table = render(
            &items,
            RenderMode::Table,
            &[Field::Dev, Field::SerialNumber, Field::PciAddr, Field::Sriov],
            false,
        )
        .unwrap();
        // PCI_addr is 12 wide, SRIOV 5: 12 + 5 + 3 * 2 - 2
        let rule = "-".repeat(21);
        let expected = [
            rule.as_str(),
            "Dev #1   SN: SN1",
            &rule,
            "  PCI_addr   | SRIOV",
            &rule,
            "0000:01:00.0 | PF   ",
            "0000:01:00.2 |   VF ",
            &rule,
            "",
        ]
        .join("\n");
        assert_eq!(table, expected);
    }

    #[test]
    fn summary_can_be_wider_than_the_rows() {
        let items = items(vec![pf("0000:01:00.0", "MT2014X04321")]);
        let table = render(
            &items,
            RenderMode::Table,
            &[Field::SerialNumber, Field::Port],
            false,
        )
        .unwrap();
        // "SN" + "MT2014X04321" + 5
        assert_eq!(table.lines().next().unwrap(), "-".repeat(19));
    }

    #[test]
    fn annotations_only_when_requested() {
        let device = DeviceRecordBuilder::default()
            .address("0000:01:00.0".parse().unwrap())
            .kind(FunctionKind::Physical)
            .serial("SN1")
            .lnk_cap_width(16)
            .lnk_sta_width(8)
            .build()
            .unwrap();
        let items = items(vec![device]);
        let order = [Field::LnkStaWidth];
        assert!(render(&items, RenderMode::Table, &order, true).unwrap().contains("x8 >!<"));
        assert!(!render(&items, RenderMode::Table, &order, false).unwrap().contains(">!<"));
        assert!(!render(&items, RenderMode::Structured, &order, true).unwrap().contains(">!<"));
    }

    #[test]
    fn no_items_renders_nothing() {
        assert_eq!(render(&[], RenderMode::Table, &[Field::Dev], true).unwrap(), "");
        assert_eq!(render(&[], RenderMode::Structured, &[Field::Dev], true).unwrap(), "[]");
    }

    #[test]
    fn structured_output_round_trips() {
        let items = items(vec![
            pf("0000:01:00.0", "SN1"),
            vf("0000:01:00.2", "0000:01:00.0"),
            pf("0000:02:00.0", "SN2"),
        ]);
        let json = render(&items, RenderMode::Structured, &[], false).unwrap();
        assert!(json.starts_with("[\n    {\n        \"bdf_devices\": ["));

        let parsed: Vec<BTreeMap<String, serde_json::Value>> = serde_json::from_str(&json).unwrap();
        let mut triples = BTreeSet::new();
        for (at, item) in parsed.iter().enumerate() {
            for (key, value) in item["hca_info"].as_object().unwrap() {
                triples.insert((at, None, key.clone(), value.as_str().unwrap().to_string()));
            }
            for (row, device) in item["bdf_devices"].as_array().unwrap().iter().enumerate() {
                for (key, value) in device.as_object().unwrap() {
                    triples.insert((at, Some(row), key.clone(), value.as_str().unwrap().to_string()));
                }
            }
        }

        let mut expected = BTreeSet::new();
        for (at, item) in items.iter().enumerate() {
            for (field, cell) in &item.hca_info {
                expected.insert((at, None, field.to_string(), cell.text().to_string()));
            }
            for (row, device) in item.bdf_devices.iter().enumerate() {
                for (field, cell) in device {
                    expected.insert((at, Some(row), field.to_string(), cell.text().to_string()));
                }
            }
        }
        assert_eq!(triples, expected);
    }
}

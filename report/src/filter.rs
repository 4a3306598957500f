// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Field selection and `field=regex` predicates.

use crate::item::ReportItem;
use hardware::field::Field;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use strum::VariantNames;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("'{0}' is not of the form field=regex")]
    MissingSeparator(String),
    #[error("unknown field '{name}', valid fields are: {}", Field::VARIANTS.join(", "))]
    UnknownField { name: String },
    #[error("invalid regular expression '{pattern}'")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Parse a field by its report name.
///
/// # Errors
///
/// Returns [`FilterError::UnknownField`] if no field has that name.
pub fn parse_field(name: &str) -> Result<Field, FilterError> {
    name.parse().map_err(|_| FilterError::UnknownField {
        name: name.to_string(),
    })
}

/// The columns of the report, in display order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldSelection {
    order: Vec<Field>,
}

impl FieldSelection {
    /// A non-empty `positive` list replaces `default` entirely; otherwise the `negative` fields
    /// are removed from `default`.
    #[must_use]
    pub fn new(default: Vec<Field>, positive: &[Field], negative: &[Field]) -> FieldSelection {
        let order = if positive.is_empty() {
            default
                .into_iter()
                .filter(|field| !negative.contains(field))
                .collect()
        } else {
            let mut order: Vec<Field> = Vec::with_capacity(positive.len());
            for field in positive {
                if !order.contains(field) {
                    order.push(*field);
                }
            }
            order
        };
        FieldSelection { order }
    }

    #[must_use]
    pub fn order(&self) -> &[Field] {
        &self.order
    }

    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.order.contains(&field)
    }
}

/// A `field=regex` constraint.  The regex must match the whole plain value.
#[derive(Clone, Debug)]
pub struct WherePredicate {
    field: Field,
    pattern: Regex,
    source: String,
}

impl WherePredicate {
    #[must_use]
    pub fn field(&self) -> Field {
        self.field
    }

    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Drop every row whose value of the field does not match, then every item left without
    /// rows or whose summary value does not match.
    pub fn apply(&self, items: &mut Vec<ReportItem>) {
        let passes = |value: Option<&hardware::field::Cell>| value.is_none_or(|cell| self.matches(cell.text()));
        items.retain_mut(|item| {
            item.bdf_devices.retain(|row| passes(row.get(&self.field)));
            let keep = !item.bdf_devices.is_empty() && passes(item.hca_info.get(&self.field));
            if !keep {
                debug!("{self} removes adapter {:?}", item.hca_info.get(&Field::Dev).map(ToString::to_string));
            }
            keep
        });
    }
}

impl FromStr for WherePredicate {
    type Err = FilterError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (name, pattern) = text
            .split_once('=')
            .ok_or_else(|| FilterError::MissingSeparator(text.to_string()))?;
        let field = parse_field(name)?;
        let anchored = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            FilterError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(WherePredicate {
            field,
            pattern: anchored,
            source: text.to_string(),
        })
    }
}

impl Display for WherePredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Command line of `lshca` and the immutable [`RunConfiguration`] derived from it.

#![deny(clippy::pedantic, clippy::unwrap_used)]

pub mod settings;

pub use clap::Parser;
use hardware::field::{Field, TemperatureThresholds, View};
use probe::ProbeConfig;
use report::{FieldSelection, FilterError, RenderMode, WherePredicate, parse_field};
use settings::{Settings, SettingsError};
use std::fmt::Write;
use std::path::PathBuf;
use std::str::FromStr;
use strum::IntoEnumIterator;
use tracing::debug;

pub const DEFAULT_RECORD_DIR: &str = "/tmp/lshca";

/// Run mode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    /// Capture every query in a debug archive.
    Record,
}

/// Data sources which can be enabled on top of the always used ones.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Source {
    /// PCI details; always enabled
    Lspci,
    /// Driver state; always enabled
    Sysfs,
    /// MST device paths, requires the MFT tools
    Mst,
    /// Switch and subnet manager identity of IB ports
    Saquery,
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum InvalidCmdArguments {
    #[error(transparent)]
    #[diagnostic(help("run with --hh for the list of fields"))]
    Filter(#[from] FilterError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Settings(#[from] SettingsError),
}

#[derive(Debug, Parser)]
#[command(name = "lshca")]
#[command(version)]
#[command(
    about = "Lists the RDMA adapters (HCAs) of this host",
    long_about = "Lists the RDMA adapters (HCAs) of this host, their physical and virtual functions and \
the state of every port, combining lspci, sysfs and vendor tool output.",
    after_help = "Run with --hh for a description of every output field."
)]
#[allow(clippy::struct_excessive_bools)]
pub struct CmdArgs {
    #[arg(short, long, help = "Log debug messages to stderr")]
    debug: bool,

    #[arg(short, long, help = "Print the report as JSON")]
    json: bool,

    #[arg(
        short,
        long,
        value_enum,
        default_value_t = Mode::Normal,
        help = "normal: print the report. record: also write a debug archive of every query"
    )]
    mode: Mode,

    #[arg(
        short = 'w',
        long,
        value_name = "VIEW",
        value_parser = View::from_str,
        help = "Output view: system (default), ib or roce. ib implies the saquery source"
    )]
    view: Option<View>,

    #[arg(
        short,
        long,
        value_enum,
        num_args = 1..,
        value_delimiter = ',',
        help = "Additional data sources, separated by commas or spaces"
    )]
    sources: Vec<Source>,

    #[arg(
        short = 'o',
        value_name = "FIELD",
        num_args = 1..,
        value_delimiter = ',',
        help = "Show only these fields, in this order"
    )]
    output: Vec<String>,

    #[arg(
        long = "onot",
        value_name = "FIELD",
        num_args = 1..,
        value_delimiter = ',',
        help = "Hide these fields. Ignored if -o is given"
    )]
    output_not: Vec<String>,

    #[arg(
        long = "ow",
        value_name = "FIELD=REGEX",
        num_args = 1..,
        value_delimiter = ',',
        help = "Only show ports whose FIELD matches REGEX entirely. Separated by commas or spaces, all must match.
Adapters left without ports are not shown. REGEX can not contain a comma.
Example: --ow State=actv,Link=IB"
    )]
    output_where: Vec<String>,

    #[arg(long = "hh", help = "Describe every output field and exit")]
    extended_help: bool,

    #[arg(long, value_name = "FILE", help = "YAML settings file")]
    settings: Option<PathBuf>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory for record mode archives [default: /tmp/lshca]"
    )]
    record_dir: Option<PathBuf>,
}

impl CmdArgs {
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub fn extended_help(&self) -> bool {
        self.extended_help
    }
}

/// Everything a run needs, validated up front.
#[derive(Clone, Debug)]
pub struct RunConfiguration {
    pub mode: Mode,
    pub render_mode: RenderMode,
    pub probe: ProbeConfig,
    pub selection: FieldSelection,
    pub predicates: Vec<WherePredicate>,
    pub thresholds: TemperatureThresholds,
    pub record_dir: PathBuf,
}

impl RunConfiguration {
    /// Warning and error glyphs are only shown in tables written to a terminal.
    #[must_use]
    pub fn annotate(&self, stdout_is_terminal: bool) -> bool {
        self.render_mode.is_table() && stdout_is_terminal
    }
}

fn parse_fields(names: &[String]) -> Result<Vec<Field>, FilterError> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(parse_field)
        .collect()
}

impl TryFrom<CmdArgs> for RunConfiguration {
    type Error = InvalidCmdArguments;

    /// Reads the settings file, if one is given.
    fn try_from(value: CmdArgs) -> Result<Self, InvalidCmdArguments> {
        let settings = match &value.settings {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        let view = value.view.unwrap_or_default();
        let mst = value.sources.contains(&Source::Mst);
        let saquery = view.is_ib() || value.sources.contains(&Source::Saquery);

        let mut default = view.default_order();
        if mst {
            default.push(Field::MstDevice);
        }
        if saquery {
            default.extend([Field::SmGuid, Field::SwGuid, Field::SwDescription]);
        }
        let positive = parse_fields(&value.output)?;
        let negative = parse_fields(&value.output_not)?;
        let predicates = value
            .output_where
            .iter()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .map(str::parse::<WherePredicate>)
            .collect::<Result<Vec<_>, _>>()?;

        let config = RunConfiguration {
            mode: value.mode,
            render_mode: if value.json {
                RenderMode::Structured
            } else {
                RenderMode::Table
            },
            probe: ProbeConfig {
                view,
                mst,
                saquery,
                lossless: settings.lossless_baseline(),
            },
            selection: FieldSelection::new(default, &positive, &negative),
            predicates,
            thresholds: settings.temperature_thresholds(),
            record_dir: value
                .record_dir
                .or(settings.record_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORD_DIR)),
        };
        debug!("run configuration: {config:?}");
        Ok(config)
    }
}

/// The `--hh` text: every field with its description.
#[must_use]
pub fn field_help() -> String {
    let width = Field::iter().map(|field| field.name().len()).max().unwrap_or(0);
    let mut help = String::from("Output fields:\n");
    for field in Field::iter() {
        let _ = writeln!(help, "  {:<width$}  {}", field.name(), field.description());
    }
    help.push_str("\nViews:\n");
    for view in View::iter() {
        let fields: Vec<&str> = view.default_order().into_iter().map(Field::name).collect();
        let _ = writeln!(help, "  {view:<6}  {}", fields.join(" "));
    }
    help
}

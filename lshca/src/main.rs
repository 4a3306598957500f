// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]

use args::{CmdArgs, Mode, Parser, RunConfiguration, field_help};
use miette::{Context, IntoDiagnostic};
use nix::unistd::geteuid;
use report::RenderMode;
use std::io::IsTerminal;
use sysfs::FieldSource;
use sysfs::host::HostSource;
use sysfs::record::Recorder;
use tracing::{debug, info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();
}

/// Probe, assemble, filter and render.
fn inventory<S: FieldSource>(
    source: &S,
    config: &RunConfiguration,
    annotate: bool,
) -> miette::Result<String> {
    let devices = probe::discover(source, &config.probe)
        .into_diagnostic()
        .wrap_err("failed to probe the adapters")?;
    debug!("found {} device records", devices.len());
    let adapters = hardware::topology::assemble(devices)
        .into_diagnostic()
        .wrap_err("inconsistent adapter topology")?;
    let items = report::project(
        &adapters,
        &config.selection,
        &config.predicates,
        &config.thresholds,
    );
    let mut output = report::render(
        &items,
        config.render_mode,
        config.selection.order(),
        annotate,
    )
    .into_diagnostic()?;
    if config.render_mode == RenderMode::Structured {
        output.push('\n');
    }
    Ok(output)
}

fn record(
    host: &HostSource,
    config: &RunConfiguration,
    annotate: bool,
) -> miette::Result<String> {
    let recorder = Recorder::new(host);
    let result = inventory(&recorder, config, annotate);
    let transcript = match &result {
        Ok(output) => output.clone(),
        Err(error) => error.to_string(),
    };
    let command_line = std::env::args().collect::<Vec<_>>().join(" ");
    info!("recorded {} queries", recorder.len());
    let archive = recorder
        .finish(command_line, transcript)
        .into_diagnostic()
        .wrap_err("failed to finish the debug recording")?;
    let path = archive
        .write(&config.record_dir)
        .into_diagnostic()
        .wrap_err("failed to write the debug recording")?;
    eprintln!("Debug archive written to {}", path.display());
    result
}

fn main() -> miette::Result<()> {
    let args = CmdArgs::parse();
    if args.extended_help() {
        print!("{}", field_help());
        return Ok(());
    }
    init_logging(args.debug());

    if !geteuid().is_root() {
        eprintln!("You need to have root privileges to run this script");
        std::process::exit(1);
    }

    let config = RunConfiguration::try_from(args)?;
    let annotate = config.annotate(std::io::stdout().is_terminal());
    let host = HostSource::new();
    let output = match config.mode {
        Mode::Normal => inventory(&host, &config, annotate)?,
        Mode::Record => record(&host, &config, annotate)?,
    };
    print!("{output}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use sysfs::fixture::FixtureSource;

    const CONNECTX5: &str = "Infiniband controller: Mellanox Technologies MT27800 Family [ConnectX-5]";

    fn function(source: FixtureSource, address: &str, serial: &str, rdma: &str) -> FixtureSource {
        let ib = format!("/sys/bus/pci/devices/{address}/infiniband/{rdma}");
        source
            .with_command(
                &format!("lspci -vvvD -s {address}"),
                [
                    format!("{address} {CONNECTX5}"),
                    format!("\t\t\t[SN] Serial number: {serial}"),
                ],
            )
            .with_file(&format!("{ib}/ports/1/state"), "4: ACTIVE\n")
            .with_file(&format!("{ib}/ports/1/link_layer"), "InfiniBand\n")
    }

    fn host() -> FixtureSource {
        let source = FixtureSource::default().with_command(
            "lspci -Dd 15b3:",
            [
                format!("0000:01:00.0 {CONNECTX5}"),
                format!("0000:01:00.1 {CONNECTX5}"),
                format!("0000:01:00.2 {CONNECTX5}"),
                format!("0000:81:00.0 {CONNECTX5}"),
            ],
        );
        let source = function(source, "0000:01:00.0", "MT1", "mlx5_0");
        let source = function(source, "0000:01:00.1", "MT1", "mlx5_1");
        let source = function(source, "0000:81:00.0", "MT2", "mlx5_3");
        function(source, "0000:01:00.2", "MT1", "mlx5_2")
            .with_link("/sys/bus/pci/devices/0000:01:00.2/physfn", "../0000:01:00.0")
            .with_file("/sys/bus/pci/devices/0000:81:00.0/infiniband/mlx5_3/ports/1/state", "1: DOWN\n")
    }

    fn configuration(args: &[&str]) -> RunConfiguration {
        let args = CmdArgs::try_parse_from(std::iter::once("lshca").chain(args.iter().copied())).unwrap();
        RunConfiguration::try_from(args).unwrap()
    }

    #[test]
    fn cards_and_functions() {
        let output = inventory(&host(), &configuration(&["-o", "Dev,SN,PCI_addr,SRIOV"]), false).unwrap();
        let rule = "-".repeat(21);
        let expected = [
            rule.as_str(),
            "Dev #1   SN: MT1",
            &rule,
            "  PCI_addr   | SRIOV",
            &rule,
            "0000:01:00.0 | PF   ",
            "0000:01:00.2 |   VF ",
            "0000:01:00.1 | PF   ",
            &rule,
            "Dev #2   SN: MT2",
            &rule,
            "  PCI_addr   | SRIOV",
            &rule,
            "0000:81:00.0 | PF   ",
            &rule,
            "",
        ]
        .join("\n");
        assert_eq!(output, expected);
    }

    #[test]
    fn where_clause_drops_the_down_card() {
        let output = inventory(&host(), &configuration(&["-j", "--ow", "State=actv", "-o", "SN,State"]), false).unwrap();
        assert!(output.contains("MT1"));
        assert!(!output.contains("MT2"));
        assert!(output.ends_with("]\n"));
    }
}

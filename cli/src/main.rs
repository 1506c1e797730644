mod commands;
mod terminal;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::error::ErrorKind;
use colored::*;
use commands::{CommandLine, ScanPlan, discover, scan};
use scanr_common::config::{Config, ScanConfig};
use scanr_common::error::ScanError;
use scanr_common::network::port::DEFAULT_PORT_SPEC;
use scanr_common::network::range::TargetRange;
use scanr_common::vendors::OuiVendors;
use scanr_common::{error, info, success, warn};
use scanr_core::network::raw::RawProber;
use scanr_core::orchestrator::Orchestrator;
use terminal::{logging, print, spinner};

#[tokio::main]
async fn main() -> ExitCode {
    let commands = match CommandLine::parse_args() {
        Ok(commands) => commands,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let cfg = Config {
        quiet: commands.quiet,
        verbose: commands.verbose,
        no_vendor: commands.no_vendor,
    };
    logging::init_logging(&cfg);

    match run(commands, &cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            spinner::get_spinner().finish_and_clear();
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(commands: CommandLine, cfg: &Config) -> anyhow::Result<()> {
    let plan = commands.scan_plan()?;
    let targets: TargetRange = commands.target.expand();
    if targets.is_empty() {
        return Err(ScanError::NoTargets.into());
    }
    let scan_cfg = ScanConfig::from_options(commands.timeout, commands.retry, commands.workers)?;

    print::banner(cfg.quiet);
    announce(&plan, &targets, &scan_cfg, cfg);

    if !is_root::is_root() {
        warn!("Not running as root, raw sockets will most likely be refused");
    }

    let started = Instant::now();
    let prober = Arc::new(RawProber::new(targets.as_slice()));
    let mut orchestrator = Orchestrator::new(prober, scan_cfg).with_progress(spinner::progress_callback());
    if !cfg.no_vendor {
        orchestrator = orchestrator.with_vendors(Arc::new(OuiVendors));
    }

    let work = async {
        let mut probes = 0;
        if let Some(selection) = &plan.discovery {
            probes += discover::discover(&orchestrator, selection.mode, &targets, cfg).await?.summary.executed;
        }
        if let (Some(selection), Some(ports)) = (&plan.port_scan, &plan.ports) {
            probes += scan::scan(&orchestrator, selection.mode, &targets, ports, cfg).await?.summary.executed;
        }
        anyhow::Ok(probes)
    };

    let probes = tokio::select! {
        result = work => result?,
        _ = tokio::signal::ctrl_c() => {
            spinner::get_spinner().finish_and_clear();
            warn!("Interrupted, outstanding probes were cancelled");
            return Err(ScanError::Interrupted.into());
        }
    };

    let total: ColoredString = format!("{:.2}s", started.elapsed().as_secs_f64()).bold().yellow();
    success!("Scanned {probes} probes in {total}");
    if cfg.quiet == 0 {
        print::closing_rule();
    }
    Ok(())
}

/// Logs the defaults that were picked and the flags that lost.
fn announce(plan: &ScanPlan, targets: &TargetRange, scan_cfg: &ScanConfig, cfg: &Config) {
    if let Some(selection) = &plan.discovery {
        if selection.defaulted {
            info!("No discovery technique given, using {}", selection.mode);
        }
        for lost in &selection.overridden {
            warn!("--{lost} ignored, {} discovery takes precedence", selection.mode);
        }
    }
    if let Some(selection) = &plan.port_scan {
        if selection.defaulted {
            info!("No port scan technique given, using {}", selection.mode);
        }
        for lost in &selection.overridden {
            warn!("{lost} scan ignored, {} scan takes precedence", selection.mode);
        }
    }
    if plan.ports_defaulted {
        info!("No ports given, scanning {DEFAULT_PORT_SPEC}");
    }
    if plan.ignored_port_flags {
        warn!("--port and -p- only apply to port scans (-p), ignoring them");
    }

    if cfg.quiet > 0 {
        return;
    }
    print::section("scan parameters", cfg.quiet);
    let mut pairs: Vec<(&str, String)> = vec![("Targets", format!("{} hosts", targets.len()))];
    if let Some(ports) = &plan.ports {
        pairs.push(("Ports", format!("{} ports", ports.len())));
    }
    pairs.push(("Timeout", format!("{:.2}s", scan_cfg.timeout.as_secs_f64())));
    pairs.push(("Retries", scan_cfg.retries.to_string()));
    pairs.push(("Workers", scan_cfg.workers.to_string()));
    print::parameters(&pairs);
}

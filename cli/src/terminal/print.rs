//! Report rendering.
//!
//! Every line is emitted as a `tracing` event on [`PRINT_TARGET`], so report
//! output goes through the same writer as log lines and never tears the
//! spinner. The `render_*` helpers build the lines, the rest only emits them.

use std::net::Ipv4Addr;

use colored::*;
use scanr_common::{info, success};
use unicode_width::UnicodeWidthStr;

use crate::terminal::colors;
use crate::terminal::format::Detail;

pub const TOTAL_WIDTH: usize = 64;
/// Events on this target are printed verbatim, without a level prefix.
pub const PRINT_TARGET: &str = "scanr::print";

const RULE: &str = "═";
const THIN_RULE: &str = "─";
/// Column where detail values start, relative to the host address.
const DETAIL_KEY_WIDTH: usize = 8;

#[macro_export]
macro_rules! mprint {
    () => {
        $crate::terminal::print::print("");
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg);
    };
}

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

/// `styled` centred between runs of `fill`; `plain` is the same text without
/// colour codes and decides the padding.
fn render_framed(plain: &str, styled: &str, fill: &str) -> String {
    let pad = TOTAL_WIDTH.saturating_sub(UnicodeWidthStr::width(plain));
    let left = pad / 2;
    format!(
        "{}{}{}",
        fill.repeat(left).color(colors::SEPARATOR),
        styled,
        fill.repeat(pad - left).color(colors::SEPARATOR)
    )
}

pub fn banner(q_level: u8) {
    if q_level > 0 {
        return;
    }
    let title = format!(" scanr v{} ", env!("CARGO_PKG_VERSION"));
    let styled = title.color(colors::PRIMARY).bold().to_string();
    print(&render_framed(&title, &styled, RULE));
}

/// Opens a report section, e.g. `── ICMP DISCOVERY ──`.
pub fn section(title: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }
    let title = format!(" {} ", title.to_uppercase());
    let styled = title.color(colors::ACCENT).to_string();
    print(&render_framed(&title, &styled, THIN_RULE));
}

pub fn status<T: AsRef<str>>(msg: T) {
    print(&format!("{} {}", ">".color(colors::SEPARATOR), msg.as_ref().color(colors::TEXT_DEFAULT)));
}

fn render_parameters(pairs: &[(&str, String)]) -> Vec<String> {
    let width = pairs.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}{} {}",
                format!("{key:<width$}").color(colors::PRIMARY),
                " :".color(colors::SEPARATOR),
                value.color(colors::TEXT_DEFAULT)
            )
        })
        .collect()
}

/// Key/value block with the values lined up, used for the run parameters.
pub fn parameters(pairs: &[(&str, String)]) {
    for line in render_parameters(pairs) {
        status(line);
    }
}

fn render_host(idx: usize, address: Ipv4Addr, details: &[Detail]) -> Vec<String> {
    let mut lines = Vec::with_capacity(details.len() + 1);
    lines.push(format!(
        "{} {}",
        format!("{:>3}.", idx + 1).color(colors::SEPARATOR),
        address.to_string().color(colors::IPV4_ADDR).bold()
    ));
    for (key, value) in details {
        lines.push(format!(
            "     {} {}",
            format!("{key:<DETAIL_KEY_WIDTH$}").color(colors::TEXT_DEFAULT).dimmed(),
            value
        ));
    }
    lines
}

/// One result-table row: the host address followed by its details.
pub fn host(idx: usize, address: Ipv4Addr, details: &[Detail]) {
    for line in render_host(idx, address, details) {
        print(&line);
    }
}

/// Closing line of a scan. Centred under a rule, or logged as a success line
/// when quiet.
pub fn summary(line: &str, q_level: u8) {
    if q_level > 0 {
        mprint!();
        success!("{line}");
        return;
    }
    print(&RULE.repeat(TOTAL_WIDTH).color(colors::SEPARATOR).to_string());
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(line)) / 2);
    print(&format!("{space}{line}"));
}

/// A report without a single row.
pub fn empty_report(what: &str, q_level: u8) {
    section("no results", q_level);
    status(format!("no {what} found"));
}

pub fn closing_rule() {
    print(&RULE.repeat(TOTAL_WIDTH).color(colors::SEPARATOR).to_string());
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

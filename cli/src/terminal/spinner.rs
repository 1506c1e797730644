use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use scanr_core::scheduler::ProgressCallback;

/// The progress line of the running batch, if any.
pub struct SpinnerHandle {
    active: Mutex<Option<ProgressBar>>,
}

impl SpinnerHandle {
    fn lock(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start(&self, label: String) {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&[
                "▁▁▁▁▁",
                "▁▂▂▂▁",
                "▁▄▂▄▁",
                "▂▄▆▄▂",
                "▄▆█▆▄",
                "▂▄▆▄▂",
                "▁▄▂▄▁",
                "▁▂▂▂▁",
            ]);
        pb.set_style(style);
        pb.set_message(label);
        pb.enable_steady_tick(Duration::from_millis(100));

        if let Some(previous) = self.lock().replace(pb) {
            previous.finish_and_clear();
        }
    }

    pub fn set_message(&self, msg: String) {
        if let Some(pb) = self.lock().as_ref() {
            pb.set_message(msg);
        }
    }

    pub fn finish_and_clear(&self) {
        if let Some(pb) = self.lock().take() {
            pb.finish_and_clear();
        }
    }

    /// Prints above the progress line, or straight to stdout without one.
    pub fn println(&self, msg: &str) {
        match self.lock().as_ref() {
            Some(pb) if !pb.is_hidden() => pb.println(msg),
            _ => println!("{msg}"),
        }
    }
}

pub(crate) static SPINNER: OnceLock<SpinnerHandle> = OnceLock::new();

pub fn get_spinner() -> &'static SpinnerHandle {
    SPINNER.get_or_init(|| SpinnerHandle {
        active: Mutex::new(None),
    })
}

pub fn progress_message(done: usize, total: usize) -> String {
    format!(
        "{}/{} probes done...",
        done.to_string().green().bold(),
        total.to_string().bold()
    )
}

/// Scheduler callback driving the spinner message.
pub fn progress_callback() -> ProgressCallback {
    std::sync::Arc::new(|done, total| get_spinner().set_message(progress_message(done, total)))
}

pub struct SpinnerWriter;

impl std::io::Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let msg = String::from_utf8_lossy(buf);
        get_spinner().println(msg.trim_end());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::terminal::colors;

static SPINNER: OnceLock<ProgressBar> = OnceLock::new();
static ACTIVE: AtomicBool = AtomicBool::new(false);

fn spinner() -> &'static ProgressBar {
    SPINNER.get_or_init(init_spinner)
}

fn init_spinner() -> ProgressBar {
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
    pb
}

pub fn start(message: &str) {
    let pb = spinner();
    pb.set_message(message.color(colors::TEXT_DEFAULT).to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    ACTIVE.store(true, Ordering::Relaxed);
}

pub fn finish() {
    ACTIVE.store(false, Ordering::Relaxed);
    spinner().finish_and_clear();
}

/// Routes log lines above the spinner while it runs, to stdout otherwise.
pub struct SpinnerWriter;

impl Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if ACTIVE.load(Ordering::Relaxed) {
            let msg = String::from_utf8_lossy(buf);
            spinner().println(msg.trim_end());
        } else {
            std::io::stdout().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()
    }
}

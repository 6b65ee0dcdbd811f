//! Terminal rendering of command steps and upload progress.

use std::io::{self, Write};
use std::sync::Mutex;

use console::style;
use gondor_core::report::{Reporter, StepMarker};

/// Width of the upload progress bar, brackets included.
const BAR_WIDTH: usize = 77;

/// Which standard stream a reporter writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Default)]
struct State {
    /// A progress bar is on the current line
    bar_active: bool,
    last_percent: Option<u64>,
}

/// Prints `text... [ok]` style step lines and an in-place progress bar.
pub struct TerminalReporter {
    stream: Stream,
    state: Mutex<State>,
}

impl TerminalReporter {
    pub fn new(stream: Stream) -> Self {
        Self {
            stream,
            state: Mutex::new(State::default()),
        }
    }

    fn write(&self, text: &str) {
        // Write errors (e.g. a closed pipe) are ignored.
        let _ = match self.stream {
            Stream::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(text.as_bytes()).and_then(|_| out.flush())
            }
            Stream::Stderr => {
                let mut err = io::stderr().lock();
                err.write_all(text.as_bytes()).and_then(|_| err.flush())
            }
        };
    }

    /// Move past a progress bar before printing anything else.
    fn close_bar(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.bar_active {
            state.bar_active = false;
            state.last_percent = None;
            drop(state);
            self.write("\n");
        }
    }
}

impl Reporter for TerminalReporter {
    fn begin(&self, text: &str) {
        self.close_bar();
        self.write(text);
    }

    fn end(&self, marker: StepMarker) {
        self.close_bar();
        let label = format!("[{}]", marker.as_str());
        let styled = match marker {
            StepMarker::Ok => style(label).green(),
            StepMarker::Unknown => style(label).yellow(),
            StepMarker::Error | StepMarker::Failed | StepMarker::Locked => style(label).red(),
        };
        self.write(&format!("{styled}\n"));
    }

    fn line(&self, text: &str) {
        self.close_bar();
        self.write(&format!("{text}\n"));
    }

    fn progress(&self, sent: u64, total: u64) {
        let percent = percent(sent, total);
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.bar_active && state.last_percent == Some(percent) {
                return;
            }
            state.bar_active = true;
            state.last_percent = Some(percent);
        }
        self.write(&format!("\r{}", render_bar(sent, total, BAR_WIDTH)));
    }
}

fn percent(sent: u64, total: u64) -> u64 {
    if total == 0 {
        return 100;
    }
    (sent.min(total) * 100) / total
}

/// `[=========>          ] 42%`, `width` counting the brackets.
pub fn render_bar(sent: u64, total: u64, width: usize) -> String {
    let inner = width.saturating_sub(2);
    let percent = percent(sent, total);
    let filled = (inner as u64 * percent / 100) as usize;

    let mut bar = String::with_capacity(width + 5);
    bar.push('[');
    if filled >= inner {
        bar.push_str(&"=".repeat(inner));
    } else if filled > 0 {
        bar.push_str(&"=".repeat(filled - 1));
        bar.push('>');
        bar.push_str(&" ".repeat(inner - filled));
    } else {
        bar.push_str(&" ".repeat(inner));
    }
    bar.push(']');
    bar.push_str(&format!(" {percent:>3}%"));
    bar
}

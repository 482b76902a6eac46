use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::{Duration, Instant};

/// How progress is reported on stderr.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Spinner,
}

impl UiMode {
    pub fn parse(flag: &str) -> Self {
        match flag.trim() {
            "plain" => UiMode::Plain,
            "spinner" | "pretty" => UiMode::Spinner,
            _ => UiMode::Auto,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ui {
    spinner: bool,
}

impl Ui {
    /// Spinners need an interactive stderr; `Auto` additionally stays plain
    /// when stdout is piped so scripted runs get line-oriented output.
    pub fn new(mode: UiMode) -> Self {
        let stderr_tty = std::io::stderr().is_terminal();
        let stdout_tty = std::io::stdout().is_terminal();
        let spinner = stderr_tty
            && match mode {
                UiMode::Spinner => true,
                UiMode::Auto => stdout_tty,
                UiMode::Plain => false,
            };
        Self { spinner }
    }

    pub fn stage(&self, name: &str) -> Stage {
        let bar = if self.spinner {
            let bar = ProgressBar::new_spinner();
            bar.set_draw_target(ProgressDrawTarget::stderr());
            bar.enable_steady_tick(Duration::from_millis(100));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(style);
            bar.set_message(format!("{name}…"));
            Some(bar)
        } else {
            eprintln!("--> {}", name);
            None
        };
        Stage {
            name: name.to_string(),
            detail: None,
            start: Instant::now(),
            bar,
        }
    }
}

/// Running stage; reports elapsed time when dropped.
pub struct Stage {
    name: String,
    detail: Option<String>,
    start: Instant,
    bar: Option<ProgressBar>,
}

impl Stage {
    /// Attach a short summary shown next to the finished stage.
    pub fn detail(&mut self, detail: impl Into<String>) {
        self.detail = Some(detail.into());
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = match &self.detail {
            Some(detail) => format!("✔ {}: {} ({})", self.name, detail, format_elapsed(elapsed)),
            None => format!("✔ {} ({})", self.name, format_elapsed(elapsed)),
        };
        match &self.bar {
            Some(bar) => bar.finish_with_message(message),
            None => eprintln!("{message}"),
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}

//! Single-line spinner shown while sources are fetched.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub(crate) struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// A ticking spinner, or a hidden one when `quiet` is set.
    pub(crate) fn new(quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("  {spinner:.cyan} {msg}")
                    .expect("static pattern")
                    .tick_chars("/-\\|"),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };
        Self { pb }
    }

    pub(crate) fn set_message(&self, msg: String) {
        self.pb.set_message(msg);
    }

    /// Run `f` with the spinner line cleared, so log output is not garbled.
    pub(crate) fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.pb.suspend(f)
    }

    pub(crate) fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

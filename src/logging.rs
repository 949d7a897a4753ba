use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

const DEFAULT_FILTER: &str = "anscalc=warn";
const DEBUG_FILTER: &str = "anscalc=debug";

/// Switches between the startup filter and debug output while the REPL runs.
pub struct LogControl {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
    debug: bool,
}

impl LogControl {
    /// A control with no subscriber behind it, for tests.
    pub fn detached() -> LogControl {
        LogControl {
            handle: None,
            debug: false,
        }
    }

    #[cfg(test)]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Flips debug output and returns the new state.
    pub fn toggle_debug(&mut self) -> bool {
        self.debug = !self.debug;
        if let Some(handle) = &self.handle {
            let directive = if self.debug { DEBUG_FILTER } else { DEFAULT_FILTER };
            if let Err(err) = handle.modify(|filter| *filter = EnvFilter::new(directive)) {
                eprintln!("Failed to change log level: {}", err);
            }
        }
        self.debug
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the defaults.
pub fn init(debug: bool) -> LogControl {
    let default = if debug { DEBUG_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    LogControl {
        handle: Some(handle),
        debug,
    }
}

use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

use sensor::error::EngineError;

/// Returns whether terminal output should include backtraces.
fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

/// Result type for service operations.
pub type EmitterResult<T> = Result<T, EmitterError>;

/// Captured backtrace wrapper so that variants can carry one without a custom derive.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type of the sensor engine service.
///
/// Wraps [`EngineError`] for failures of the engine and its sinks, and adds variants for
/// startup failures.
#[derive(Debug)]
pub enum EmitterError {
    /// Engine or sink error.
    Engine(EngineError),
    /// Configuration or telemetry setup error.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// I/O error.
    Io(std::io::Error, CapturedBacktrace),
}

impl EmitterError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            EmitterError::Engine(_) => "engine error",
            EmitterError::Config(_, _) => "configuration error",
            EmitterError::Io(_, _) => "i/o error",
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            EmitterError::Engine(err) => err.backtrace(),
            EmitterError::Config(_, captured) => Some(&captured.0),
            EmitterError::Io(_, captured) => Some(&captured.0),
        }
    }

    /// Creates a configuration error from any error.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        EmitterError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns a user-oriented report for terminal output.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("sensor engine failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {self}\n"));

        // Aggregated engine errors already list every cause in their display.
        if !matches!(self, EmitterError::Engine(err) if err.errors().is_some()) {
            let mut source = Error::source(self);
            let mut idx = 1usize;
            while let Some(err) = source {
                out.push_str(&format!("cause {idx}: {err}\n"));
                source = err.source();
                idx += 1;
            }
        }

        if should_render_backtrace() {
            if let Some(backtrace) = self.backtrace() {
                out.push_str("backtrace:\n");
                out.push_str(&backtrace.to_string());
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
        }

        out
    }
}

impl fmt::Display for EmitterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitterError::Engine(err) => write!(f, "{err}"),
            EmitterError::Config(source, _) => write!(f, "configuration error: {source}"),
            EmitterError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for EmitterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EmitterError::Engine(err) => err.source(),
            EmitterError::Config(source, _) => Some(source.as_ref()),
            EmitterError::Io(source, _) => Some(source),
        }
    }
}

impl From<std::io::Error> for EmitterError {
    fn from(err: std::io::Error) -> Self {
        EmitterError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<EngineError> for EmitterError {
    fn from(err: EngineError) -> Self {
        EmitterError::Engine(err)
    }
}

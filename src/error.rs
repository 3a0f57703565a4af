/// Application error carrying the process exit code it should map to.
///
/// Exit codes:
/// - 1: no data could be loaded from cache or fetched from the API
/// - 2: configuration / filesystem errors (bad flags, unwritable paths)
/// - 4: runtime errors (transport, parse, terminal)
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Fatal "nothing to show" error: both cache and fetch came up empty.
    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(1, message)
    }

    /// Transport/parse error from the statistical API. Recoverable at the
    /// fetch layer (fallback or indicator skip); fatal only if everything
    /// fails.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

use std::time::Duration;

/// Upper bound on a single directory call unless configured otherwise.
pub const DEFAULT_DIRECTORY_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for `PixKeyRegistrationCoordinator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Applied to each `find` and `register` call separately. Expiry surfaces
    /// as `DirectoryUnavailable`.
    pub directory_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            directory_timeout: DEFAULT_DIRECTORY_TIMEOUT,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_directory_timeout(mut self, timeout: Duration) -> Self {
        self.directory_timeout = timeout;
        self
    }
}

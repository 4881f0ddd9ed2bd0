//! Network priority policy.
//!
//! The monitor itself never touches OS networking. Callers that want traffic
//! prioritised while monitoring plug in a [`NetworkPriority`] implementation:
//! - `NoopPriority`: does nothing, reports success
//! - `CommandPriority`: runs configured shell commands
//! - `RetryingPriority`: bounded retries with a circuit breaker around another policy

use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{info, warn};

/// Apply or remove an OS-level network priority policy
pub trait NetworkPriority: Send + Sync {
    /// Returns true if the policy is in effect
    fn enable(&self) -> bool;

    /// Returns true if the policy was removed
    fn disable(&self) -> bool;
}

/// Policy that changes nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPriority;

impl NetworkPriority for NoopPriority {
    fn enable(&self) -> bool {
        true
    }

    fn disable(&self) -> bool {
        true
    }
}

/// Policy backed by external commands
///
/// Each command is an argv list. `enable` succeeds when at least one enable
/// command succeeds; `disable` succeeds only when all disable commands do.
#[derive(Debug, Clone, Default)]
pub struct CommandPriority {
    enable_commands: Vec<Vec<String>>,
    disable_commands: Vec<Vec<String>>,
}

impl CommandPriority {
    pub fn new(enable_commands: Vec<Vec<String>>, disable_commands: Vec<Vec<String>>) -> Self {
        Self { enable_commands, disable_commands }
    }

    fn run(argv: &[String]) -> bool {
        let Some((program, args)) = argv.split_first() else {
            return false;
        };

        match Command::new(program).args(args).output() {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                warn!(
                    command = %argv.join(" "),
                    status = %output.status,
                    "Priority command failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            Err(e) => {
                warn!(command = %argv.join(" "), "Could not run priority command: {}", e);
                false
            }
        }
    }
}

impl NetworkPriority for CommandPriority {
    fn enable(&self) -> bool {
        let applied = self.enable_commands.iter().filter(|argv| Self::run(argv)).count();
        info!("Applied {}/{} network priority commands", applied, self.enable_commands.len());
        applied > 0
    }

    fn disable(&self) -> bool {
        // Run every command even after a failure
        let failed = self.disable_commands.iter().filter(|argv| !Self::run(argv)).count();
        if failed > 0 {
            warn!("{} network priority removal commands failed", failed);
        }
        failed == 0
    }
}

/// Retries `enable` a bounded number of times and stops trying after
/// repeated failures until reset
pub struct RetryingPriority<P> {
    inner: P,
    max_attempts: u32,
    failure_threshold: u32,
    consecutive_failures: AtomicU32,
}

impl<P: NetworkPriority> RetryingPriority<P> {
    pub fn new(inner: P, max_attempts: u32, failure_threshold: u32) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            failure_threshold: failure_threshold.max(1),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn is_open(&self) -> bool {
        self.consecutive_failures.load(Ordering::SeqCst) >= self.failure_threshold
    }

    /// Close the circuit so `enable` is attempted again
    pub fn reset(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }
}

impl<P: NetworkPriority> NetworkPriority for RetryingPriority<P> {
    fn enable(&self) -> bool {
        if self.is_open() {
            warn!("Network priority circuit is open, not retrying");
            return false;
        }

        for attempt in 1..=self.max_attempts {
            if self.inner.enable() {
                self.reset();
                return true;
            }
            warn!(attempt, max_attempts = self.max_attempts, "Enabling network priority failed");
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.failure_threshold {
            warn!(failures, "Network priority circuit opened");
        }
        false
    }

    fn disable(&self) -> bool {
        self.inner.disable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingPriority {
        succeed_on: Option<usize>,
        calls: AtomicUsize,
    }

    impl CountingPriority {
        fn new(succeed_on: Option<usize>) -> Self {
            Self { succeed_on, calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl NetworkPriority for CountingPriority {
        fn enable(&self) -> bool {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.succeed_on.is_some_and(|n| call >= n)
        }

        fn disable(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_retry_until_success() {
        let policy = RetryingPriority::new(CountingPriority::new(Some(3)), 5, 2);
        assert!(policy.enable());
        assert_eq!(policy.inner.calls(), 3);
        assert!(!policy.is_open());
    }

    #[test]
    fn test_retries_are_bounded_and_circuit_opens() {
        let policy = RetryingPriority::new(CountingPriority::new(None), 3, 2);

        assert!(!policy.enable());
        assert_eq!(policy.inner.calls(), 3);
        assert!(!policy.is_open());

        assert!(!policy.enable());
        assert_eq!(policy.inner.calls(), 6);
        assert!(policy.is_open());

        // Open circuit does not call through
        assert!(!policy.enable());
        assert_eq!(policy.inner.calls(), 6);

        policy.reset();
        assert!(!policy.enable());
        assert_eq!(policy.inner.calls(), 9);
    }

    #[test]
    fn test_empty_command_policy() {
        let policy = CommandPriority::default();
        assert!(!policy.enable());
        assert!(policy.disable());
        assert!(NoopPriority.enable());
    }

    #[test]
    fn test_missing_program_fails() {
        let policy = CommandPriority::new(
            vec![vec!["pingwatch-definitely-missing-binary".to_string()]],
            vec![vec!["pingwatch-definitely-missing-binary".to_string()]],
        );
        assert!(!policy.enable());
        assert!(!policy.disable());
    }
}

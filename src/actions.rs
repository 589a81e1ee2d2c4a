//! Action executor contract and mock implementations.
//!
//! An [`ActionExecutor`] performs one operational action against a named
//! resource and returns a human-readable report. Executors never touch the
//! conversation history — the dialogue machine owns that. The mock set
//! here fabricates reports for development and tests; production
//! implementations are swapped in behind the same trait.

use anyhow::Result;

use crate::models::Intent;

/// One operational action: restart, status, logs, or notify.
///
/// `execute` must return a non-empty report and must not mutate
/// conversation state.
pub trait ActionExecutor: Send + Sync {
    fn execute(&self, resource: &str) -> Result<String>;
}

/// Mock restart: pretends the resource was bounced.
pub struct MockRestart;

impl ActionExecutor for MockRestart {
    fn execute(&self, resource: &str) -> Result<String> {
        Ok(format!("Server {} has been restarted successfully.", resource))
    }
}

/// Mock status probe.
pub struct MockStatus;

impl ActionExecutor for MockStatus {
    fn execute(&self, resource: &str) -> Result<String> {
        Ok(format!("The status of server {} is: Running.", resource))
    }
}

/// Mock log fetch.
pub struct MockLogs;

impl ActionExecutor for MockLogs {
    fn execute(&self, resource: &str) -> Result<String> {
        Ok(format!(
            "Last 50 log lines for {}: no errors in the current window.",
            resource
        ))
    }
}

/// Mock notification dispatch.
pub struct MockNotify;

impl ActionExecutor for MockNotify {
    fn execute(&self, resource: &str) -> Result<String> {
        Ok(format!(
            "Notification email sent to the on-call team for {}.",
            resource
        ))
    }
}

/// The four executors the dialogue machine can dispatch to.
pub struct ActionSet {
    pub restart: Box<dyn ActionExecutor>,
    pub status: Box<dyn ActionExecutor>,
    pub logs: Box<dyn ActionExecutor>,
    pub notify: Box<dyn ActionExecutor>,
}

impl ActionSet {
    /// Mock executors for development and tests.
    pub fn mock() -> Self {
        Self {
            restart: Box::new(MockRestart),
            status: Box::new(MockStatus),
            logs: Box::new(MockLogs),
            notify: Box::new(MockNotify),
        }
    }

    /// The executor for an action intent; `None` for `RespondPlain`.
    pub fn for_intent(&self, intent: Intent) -> Option<&dyn ActionExecutor> {
        match intent {
            Intent::Restart => Some(self.restart.as_ref()),
            Intent::GetStatus => Some(self.status.as_ref()),
            Intent::GetLogs => Some(self.logs.as_ref()),
            Intent::SendNotification => Some(self.notify.as_ref()),
            Intent::RespondPlain => None,
        }
    }
}

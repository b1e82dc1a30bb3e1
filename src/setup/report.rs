//! Setup check results.

use std::fmt;

use serde::Serialize;

/// The outcome of a single check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "FAIL",
        };
        f.pad(label)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SetupCheck {
    pub status: CheckStatus,
    /// What was checked, e.g. "train images".
    pub subject: String,
    pub detail: String,
}

/// All checks in the order they ran.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SetupReport {
    pub checks: Vec<SetupCheck>,
}

impl SetupReport {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn pass(&mut self, subject: impl Into<String>, detail: impl Into<String>) {
        self.push(CheckStatus::Pass, subject, detail);
    }

    pub fn warn(&mut self, subject: impl Into<String>, detail: impl Into<String>) {
        self.push(CheckStatus::Warn, subject, detail);
    }

    pub fn fail(&mut self, subject: impl Into<String>, detail: impl Into<String>) {
        self.push(CheckStatus::Fail, subject, detail);
    }

    fn push(&mut self, status: CheckStatus, subject: impl Into<String>, detail: impl Into<String>) {
        self.checks.push(SetupCheck {
            status,
            subject: subject.into(),
            detail: detail.into(),
        });
    }

    pub fn failure_count(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    pub fn warning_count(&self) -> usize {
        self.count(CheckStatus::Warn)
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    pub fn is_ok(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn find(&self, subject: &str) -> Option<&SetupCheck> {
        self.checks.iter().find(|c| c.subject == subject)
    }
}

impl fmt::Display for SetupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .checks
            .iter()
            .map(|c| c.subject.len())
            .max()
            .unwrap_or(0);

        for check in &self.checks {
            writeln!(
                f,
                "  [{:>4}] {:<width$}  {}",
                check.status,
                check.subject,
                check.detail,
                width = width
            )?;
        }

        writeln!(f)?;
        if self.is_ok() {
            writeln!(
                f,
                "Setup check passed with {} warning(s)",
                self.warning_count()
            )
        } else {
            writeln!(
                f,
                "Setup check found {} problem(s) and {} warning(s)",
                self.failure_count(),
                self.warning_count()
            )
        }
    }
}

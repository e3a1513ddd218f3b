//! Boot state machine values.

use std::fmt;

/// A stage that can fail and abort the boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootStage {
    LoadingFetcher,
    LoadingAutoloader,
    LoadingDependencies,
}

impl BootStage {
    /// Stable label used in abort reports and logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::LoadingFetcher => "LoadingFetcher",
            Self::LoadingAutoloader => "LoadingAutoloader",
            Self::LoadingDependencies => "LoadingDependencies",
        }
    }
}

impl fmt::Display for BootStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the orchestrator is in its one-way boot sequence.
///
/// `NotStarted → LoadingFetcher → LoadingAutoloader → LoadingDependencies →
/// Booted | Aborted`. Any running stage may jump to `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BootState {
    #[default]
    NotStarted,
    LoadingFetcher,
    LoadingAutoloader,
    LoadingDependencies,
    Booted,
    Aborted(BootStage),
}

impl BootState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Booted | Self::Aborted(_))
    }

    /// The running stage this state corresponds to, if any.
    #[must_use]
    pub fn stage(self) -> Option<BootStage> {
        match self {
            Self::LoadingFetcher => Some(BootStage::LoadingFetcher),
            Self::LoadingAutoloader => Some(BootStage::LoadingAutoloader),
            Self::LoadingDependencies => Some(BootStage::LoadingDependencies),
            Self::NotStarted | Self::Booted | Self::Aborted(_) => None,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::LoadingFetcher => 1,
            Self::LoadingAutoloader => 2,
            Self::LoadingDependencies => 3,
            Self::Booted | Self::Aborted(_) => 4,
        }
    }

    /// Whether `next` is a legal successor. States never regress and
    /// terminal states have no successors.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Aborted(stage) => self.stage() == Some(stage),
            _ => next.rank() == self.rank() + 1,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::LoadingFetcher => "LoadingFetcher",
            Self::LoadingAutoloader => "LoadingAutoloader",
            Self::LoadingDependencies => "LoadingDependencies",
            Self::Booted => "Booted",
            Self::Aborted(_) => "Aborted",
        }
    }
}

impl fmt::Display for BootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted(stage) => write!(f, "Aborted ({stage})"),
            other => f.write_str(other.label()),
        }
    }
}

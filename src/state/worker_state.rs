/// Category worker state machine
///
/// The worker performs the side effect that belongs to its current state, turns the result
/// into a [`StepEvent`] and feeds it to [`transition`], which decides the next state and
/// the next task value. All retry and termination policy lives in `transition`.
use crate::program::ExtractionResult;
use crate::render::RenderError;
use crate::state::CrawlTask;
use std::fmt;

/// Where a category worker currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    // ===== Active States =====
    /// Loading the current listing page and extracting its items
    FetchingPage,

    /// Visiting each item's detail page and persisting the merged records
    ExtractingDetails(Vec<ExtractionResult>),

    /// Probing the current listing page for a next-page control
    CheckingNextPage,

    // ===== Terminal States =====
    /// No more pages
    Done,

    /// Retries exhausted or a non-transient error
    Failed { reason: String },

    /// Stopped by the run deadline
    Cancelled,
}

impl WorkerState {
    /// Returns true if the worker has stopped
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. } | Self::Cancelled)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchingPage => "fetching_page",
            Self::ExtractingDetails(_) => "extracting_details",
            Self::CheckingNextPage => "checking_next_page",
            Self::Done => "done",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// The outcome of a terminal state
    pub fn outcome(&self) -> Option<WorkerOutcome> {
        match self {
            Self::Done => Some(WorkerOutcome::Done),
            Self::Failed { reason } => Some(WorkerOutcome::Failed {
                reason: reason.clone(),
            }),
            Self::Cancelled => Some(WorkerOutcome::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of performing the current state's work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    /// The listing page produced these items (possibly none)
    PageFetched(Vec<ExtractionResult>),

    /// Every item of the page went through detail fetch and persistence
    DetailsPersisted,

    /// The next-page probe answered
    NextPageProbed(bool),

    /// A stale reference escaped the current step
    Transient(RenderError),

    /// A non-transient error escaped the current step
    Fatal(RenderError),

    /// The run deadline fired
    Cancelled,
}

/// Computes the next state and task for an event
pub fn transition(
    state: WorkerState,
    task: CrawlTask,
    event: StepEvent,
) -> (WorkerState, CrawlTask) {
    if state.is_terminal() {
        return (state, task);
    }

    match (state, event) {
        (_, StepEvent::Cancelled) => (WorkerState::Cancelled, task),

        (_, StepEvent::Fatal(err)) => (
            WorkerState::Failed {
                reason: err.to_string(),
            },
            task,
        ),

        (_, StepEvent::Transient(err)) => {
            let task = task.consume_retry();
            if task.retries_exhausted() {
                let reason = format!(
                    "retries exhausted on page {}: {}",
                    task.current_page(),
                    err
                );
                (WorkerState::Failed { reason }, task)
            } else {
                (WorkerState::FetchingPage, task)
            }
        }

        (WorkerState::FetchingPage, StepEvent::PageFetched(items)) => {
            if items.is_empty() {
                (WorkerState::Done, task)
            } else {
                (WorkerState::ExtractingDetails(items), task)
            }
        }

        (WorkerState::ExtractingDetails(_), StepEvent::DetailsPersisted) => {
            (WorkerState::CheckingNextPage, task)
        }

        (WorkerState::CheckingNextPage, StepEvent::NextPageProbed(true)) => {
            (WorkerState::FetchingPage, task.advance())
        }

        (WorkerState::CheckingNextPage, StepEvent::NextPageProbed(false)) => {
            (WorkerState::Done, task)
        }

        (state, event) => {
            let reason = format!("invalid transition: {} on {:?}", state, event);
            (WorkerState::Failed { reason }, task)
        }
    }
}

/// How a category finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Done,
    Failed { reason: String },
    Cancelled,
}

impl WorkerOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Rebuilds an outcome from its stored status and optional reason
    pub fn from_db(status: &str, reason: Option<String>) -> Option<Self> {
        match status {
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed {
                reason: reason.unwrap_or_default(),
            }),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for WorkerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "failed ({})", reason),
            other => f.write_str(other.to_db_string()),
        }
    }
}

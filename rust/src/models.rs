//! Core data types for the roadmap scheduler.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::SchedulerError;

/// Item identifier as assigned by the tracking service.
pub type ItemId = u64;

/// Subsystem a work item belongs to, in descending priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Core,
    World,
    Traversal,
    Ai,
    Security,
    Mcp,
    Systems,
    Observability,
    Devx,
}

impl Scope {
    /// All scopes, highest priority first.
    pub const ALL: [Scope; 9] = [
        Scope::Core,
        Scope::World,
        Scope::Traversal,
        Scope::Ai,
        Scope::Security,
        Scope::Mcp,
        Scope::Systems,
        Scope::Observability,
        Scope::Devx,
    ];

    /// Position in the priority list (0 = highest).
    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Core => "core",
            Scope::World => "world",
            Scope::Traversal => "traversal",
            Scope::Ai => "ai",
            Scope::Security => "security",
            Scope::Mcp => "mcp",
            Scope::Systems => "systems",
            Scope::Observability => "observability",
            Scope::Devx => "devx",
        }
    }

    /// Parse a scope label such as `core` or `scope:core`.
    ///
    /// Returns `None` for labels outside the priority list.
    pub fn parse(label: &str) -> Option<Self> {
        let name = strip_label_prefix(label, "scope:");
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of work an item represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkType {
    Feature,
    Infra,
    Security,
    Enhancement,
    Spike,
    Refactor,
    Docs,
    Test,
}

impl WorkType {
    pub const ALL: [WorkType; 8] = [
        WorkType::Feature,
        WorkType::Infra,
        WorkType::Security,
        WorkType::Enhancement,
        WorkType::Spike,
        WorkType::Refactor,
        WorkType::Docs,
        WorkType::Test,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkType::Feature => "feature",
            WorkType::Infra => "infra",
            WorkType::Security => "security",
            WorkType::Enhancement => "enhancement",
            WorkType::Spike => "spike",
            WorkType::Refactor => "refactor",
            WorkType::Docs => "docs",
            WorkType::Test => "test",
        }
    }

    /// Parse a type label such as `feature` or `type:feature`.
    pub fn parse(label: &str) -> Option<Self> {
        let name = strip_label_prefix(label, "type:");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Release grouping tag `M<n>`; lower `n` is more urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Milestone(pub u32);

impl Milestone {
    /// Parse `M3` or `milestone:M3`. Anything else yields `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = strip_label_prefix(tag, "milestone:");
        let digits = tag.strip_prefix('M')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Milestone)
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

fn strip_label_prefix<'a>(label: &'a str, prefix: &str) -> &'a str {
    let label = label.trim();
    match label.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => label[prefix.len()..].trim(),
        _ => label,
    }
}

/// Open/closed state in the tracking service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LifecycleState {
    #[default]
    Open,
    Closed,
}

impl FromStr for LifecycleState {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(SchedulerError::InvalidLifecycle(s.to_string())),
        }
    }
}

/// Progress status, tracked separately from the lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorkStatus {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

impl WorkStatus {
    /// Parse a status value. Unrecognised statuses count as not started.
    pub fn parse(status: &str) -> Self {
        let normalized = status.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "in-progress" => Self::InProgress,
            "done" => Self::Done,
            _ => Self::NotStarted,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }
}

/// A unit of schedulable work from the backlog snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkItem {
    pub id: ItemId,
    pub title: String,
    pub scope: Option<Scope>,
    pub work_type: Option<WorkType>,
    pub milestone: Option<Milestone>,
    pub lifecycle: LifecycleState,
    pub status: WorkStatus,
    pub order: Option<u32>,
    pub start: Option<NaiveDate>,
    pub finish: Option<NaiveDate>,
    pub created_on: Option<NaiveDate>,
    pub closed_on: Option<NaiveDate>,
}

impl WorkItem {
    pub fn new(id: ItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Self::default()
        }
    }

    /// Closed or done items take no part in scheduling.
    pub fn is_finished(&self) -> bool {
        self.lifecycle == LifecycleState::Closed || self.status == WorkStatus::Done
    }
}

/// Inclusive day span of `start..=finish`, never less than one day.
pub fn inclusive_days(start: NaiveDate, finish: NaiveDate) -> u32 {
    let days = (finish - start).num_days() + 1;
    u32::try_from(days.max(1)).unwrap_or(u32::MAX)
}

/// Which branch of the date walk produced a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeReason {
    New,
    PartialFill,
    ShiftForward,
    OverdueShift,
    ExtendInProgress,
    AdjustInProgress,
    StartInProgress,
    FinishInfer,
}

impl ChangeReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::PartialFill => "partial-fill",
            Self::ShiftForward => "shift-forward",
            Self::OverdueShift => "overdue-shift",
            Self::ExtendInProgress => "extend-in-progress",
            Self::AdjustInProgress => "adjust-in-progress",
            Self::StartInProgress => "start-in-progress",
            Self::FinishInfer => "finish-infer",
        }
    }
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A start/finish correction for one item, to be persisted by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleChange {
    pub item_id: ItemId,
    pub old_start: Option<NaiveDate>,
    pub old_finish: Option<NaiveDate>,
    pub new_start: NaiveDate,
    pub new_finish: NaiveDate,
    pub reason: ChangeReason,
}

impl fmt::Display for ScheduleChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}: {} -> {} .. {} ({})",
            self.item_id,
            format_window(self.old_start, self.old_finish),
            self.new_start,
            self.new_finish,
            self.reason
        )
    }
}

fn format_window(start: Option<NaiveDate>, finish: Option<NaiveDate>) -> String {
    let show = |d: Option<NaiveDate>| d.map_or_else(|| "?".to_string(), |d| d.to_string());
    format!("[{} .. {}]", show(start), show(finish))
}

/// A backlog position change for one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderMove {
    pub item_id: ItemId,
    /// `None` when the item had no recorded position.
    pub old_order: Option<u32>,
    pub new_order: u32,
}

impl fmt::Display for OrderMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.old_order {
            Some(old) => write!(f, "#{}: order {} -> {}", self.item_id, old, self.new_order),
            None => write!(f, "#{}: order - -> {}", self.item_id, self.new_order),
        }
    }
}

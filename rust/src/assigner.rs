//! Sequential date assignment under single-resource capacity.
//!
//! Items are walked in backlog order with one cursor marking the next free
//! day. Not-started work is packed after the cursor; in-progress work keeps
//! its recorded start and only has its finish pulled up to today when it has
//! overrun.

use chrono::{Days, NaiveDate};

use crate::estimator::DurationEstimator;
use crate::models::{inclusive_days, ChangeReason, ScheduleChange, WorkItem, WorkStatus};
use crate::{log_changes, log_checks, log_debug};

/// Next available start day. Never moves backwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    next_free: NaiveDate,
}

impl Cursor {
    pub fn new(today: NaiveDate) -> Self {
        Self { next_free: today }
    }

    pub fn next_free(&self) -> NaiveDate {
        self.next_free
    }

    /// Earliest start for new work: the cursor, but never before today.
    pub fn slot(&self, today: NaiveDate) -> NaiveDate {
        self.next_free.max(today)
    }

    /// Mark everything through `finish` as taken.
    pub fn advance_past(&mut self, finish: NaiveDate) {
        self.next_free = self.next_free.max(day_after(finish));
    }
}

fn day_after(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// Last day of a window of `duration_days` starting at `start`.
pub fn finish_for(start: NaiveDate, duration_days: u32) -> NaiveDate {
    let extra = u64::from(duration_days.max(1) - 1);
    start.checked_add_days(Days::new(extra)).unwrap_or(NaiveDate::MAX)
}

/// Visit order: by recorded order, unordered items last by id.
fn visit_order(items: &[WorkItem]) -> Vec<&WorkItem> {
    let mut ordered: Vec<&WorkItem> = items.iter().collect();
    ordered.sort_by_key(|item| (item.order.is_none(), item.order, item.id));
    ordered
}

/// Walk the backlog and compute start/finish corrections.
///
/// Closed and done items are skipped without touching the cursor. A change is
/// emitted only when the start or finish differs from what is recorded.
pub fn assign_dates(
    items: &[WorkItem],
    estimator: &DurationEstimator,
    today: NaiveDate,
    verbosity: u8,
) -> Vec<ScheduleChange> {
    let mut cursor = Cursor::new(today);
    let mut changes = Vec::new();

    for item in visit_order(items) {
        if item.is_finished() {
            log_checks!(verbosity, "#{} skipped (closed or done)", item.id);
            continue;
        }

        let window = match item.status {
            WorkStatus::InProgress => place_in_progress(item, estimator, today),
            _ => place_not_started(item, estimator, &cursor, today),
        };
        cursor.advance_past(window.finish);
        log_debug!(verbosity, "cursor -> {}", cursor.next_free());

        match window.reason {
            Some(reason) if window.differs_from(item) => {
                let change = ScheduleChange {
                    item_id: item.id,
                    old_start: item.start,
                    old_finish: item.finish,
                    new_start: window.start,
                    new_finish: window.finish,
                    reason,
                };
                log_changes!(verbosity, "{}", change);
                changes.push(change);
            }
            _ => log_checks!(
                verbosity,
                "#{} unchanged {} .. {}",
                item.id,
                window.start,
                window.finish
            ),
        }
    }

    changes
}

/// Where one item lands, and why it moved (if it did).
struct Window {
    start: NaiveDate,
    finish: NaiveDate,
    reason: Option<ChangeReason>,
}

impl Window {
    fn kept(start: NaiveDate, finish: NaiveDate) -> Self {
        Self {
            start,
            finish,
            reason: None,
        }
    }

    fn changed(start: NaiveDate, finish: NaiveDate, reason: ChangeReason) -> Self {
        Self {
            start,
            finish,
            reason: Some(reason),
        }
    }

    fn differs_from(&self, item: &WorkItem) -> bool {
        item.start != Some(self.start) || item.finish != Some(self.finish)
    }
}

fn place_in_progress(item: &WorkItem, estimator: &DurationEstimator, today: NaiveDate) -> Window {
    match (item.start, item.finish) {
        (Some(start), Some(finish)) => {
            if today > finish {
                Window::changed(start, today, ChangeReason::ExtendInProgress)
            } else {
                Window::kept(start, finish)
            }
        }
        (start, finish) => {
            let start_missing = start.is_none();
            let start = start.unwrap_or(today);
            let planned = finish
                .unwrap_or_else(|| finish_for(start, estimator.duration_for(item)));
            let overran = today > planned;
            let finish = planned.max(today);

            let reason = if start_missing {
                ChangeReason::StartInProgress
            } else if overran {
                ChangeReason::AdjustInProgress
            } else {
                ChangeReason::FinishInfer
            };
            Window::changed(start, finish, reason)
        }
    }
}

fn place_not_started(
    item: &WorkItem,
    estimator: &DurationEstimator,
    cursor: &Cursor,
    today: NaiveDate,
) -> Window {
    match (item.start, item.finish) {
        (Some(start), Some(finish)) => {
            let overdue = finish < today;
            if !overdue && start >= cursor.next_free() {
                return Window::kept(start, finish);
            }
            let duration = inclusive_days(start, finish);
            // An inverted overdue range may carry a start past today
            let new_start = cursor.slot(today).max(start);
            let reason = if overdue {
                ChangeReason::OverdueShift
            } else {
                ChangeReason::ShiftForward
            };
            Window::changed(new_start, finish_for(new_start, duration), reason)
        }
        (start, finish) => {
            let new_start = start.map_or(cursor.slot(today), |s| s.max(cursor.slot(today)));
            let new_finish = finish_for(new_start, estimator.duration_for(item));
            let reason = if start.is_none() && finish.is_none() {
                ChangeReason::New
            } else {
                ChangeReason::PartialFill
            };
            Window::changed(new_start, new_finish, reason)
        }
    }
}

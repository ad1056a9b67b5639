//! End-to-end roadmap scheduling over one snapshot.

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

use crate::assigner::assign_dates;
use crate::config::{PlacementStrategy, SchedulerConfig};
use crate::estimator::DurationEstimator;
use crate::models::{ItemId, OrderMove, ScheduleChange, WorkItem};
use crate::planner::{plan, OrderPlan};
use crate::{log_changes, log_checks};

/// Errors that stop a run before any computation happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Unknown placement strategy: {0}")]
    UnknownStrategy(String),
    #[error("Target item not found: #{0}")]
    TargetNotFound(ItemId),
    #[error("Target item #{0} is closed or done and holds no backlog position")]
    TargetFinished(ItemId),
    #[error("Invalid lifecycle state: {0}")]
    InvalidLifecycle(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Everything a run would write back: order moves first, then dates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulePlan {
    pub order_moves: Vec<OrderMove>,
    pub date_changes: Vec<ScheduleChange>,
}

impl SchedulePlan {
    pub fn is_empty(&self) -> bool {
        self.order_moves.is_empty() && self.date_changes.is_empty()
    }
}

impl fmt::Display for SchedulePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "no changes");
        }
        for m in &self.order_moves {
            writeln!(f, "{}", m)?;
        }
        for c in &self.date_changes {
            writeln!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Place `target_id` within the open backlog of `items`.
///
/// Closed and done items hold no backlog position, so they can neither be
/// placed nor shift anything else.
pub fn place_target(
    items: &[WorkItem],
    target_id: ItemId,
    strategy: PlacementStrategy,
    verbosity: u8,
) -> Result<OrderPlan, SchedulerError> {
    let target = items
        .iter()
        .find(|item| item.id == target_id)
        .ok_or(SchedulerError::TargetNotFound(target_id))?;
    if target.is_finished() {
        return Err(SchedulerError::TargetFinished(target_id));
    }

    let backlog: Vec<WorkItem> = items
        .iter()
        .filter(|item| !item.is_finished())
        .cloned()
        .collect();
    log_changes!(verbosity, "Placing #{} ({})", target_id, strategy);
    Ok(plan(&backlog, target, strategy, verbosity))
}

/// Scheduler over a point-in-time snapshot of the backlog.
///
/// Holds no state between runs; every call recomputes from the snapshot.
pub struct RoadmapScheduler {
    items: Vec<WorkItem>,
    today: NaiveDate,
    config: SchedulerConfig,
    estimator: DurationEstimator,
}

impl RoadmapScheduler {
    /// Create a scheduler, deriving duration history from the snapshot's closed items.
    pub fn new(items: Vec<WorkItem>, today: NaiveDate, config: SchedulerConfig) -> Self {
        let estimator = DurationEstimator::from_items(&items, config.fallback_days)
            .with_verbosity(config.verbosity);
        log_checks!(
            config.verbosity,
            "{} items, {} historical samples, today {}",
            items.len(),
            estimator.sample_count(),
            today
        );
        Self {
            items,
            today,
            config,
            estimator,
        }
    }

    pub fn estimator(&self) -> &DurationEstimator {
        &self.estimator
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Work out where `target_id` belongs without touching dates.
    pub fn plan_placement(
        &self,
        target_id: ItemId,
        strategy: PlacementStrategy,
    ) -> Result<OrderPlan, SchedulerError> {
        place_target(&self.items, target_id, strategy, self.config.verbosity)
    }

    /// Date corrections for the snapshot as it stands.
    pub fn reschedule(&self) -> Vec<ScheduleChange> {
        assign_dates(
            &self.items,
            &self.estimator,
            self.today,
            self.config.verbosity,
        )
    }

    /// Place `target_id`, then reassign dates against the resulting order.
    pub fn schedule(
        &self,
        target_id: ItemId,
        strategy: PlacementStrategy,
    ) -> Result<SchedulePlan, SchedulerError> {
        let placement = self.plan_placement(target_id, strategy)?;

        let reordered: Vec<WorkItem> = self
            .items
            .iter()
            .map(|item| {
                let mut item = item.clone();
                if let Some(&position) = placement.desired_order.get(&item.id) {
                    item.order = Some(position);
                }
                item
            })
            .collect();

        let date_changes = assign_dates(
            &reordered,
            &self.estimator,
            self.today,
            self.config.verbosity,
        );

        Ok(SchedulePlan {
            order_moves: placement.moves,
            date_changes,
        })
    }

    /// Like [`schedule`](Self::schedule), parsing the strategy name first.
    pub fn schedule_named(
        &self,
        target_id: ItemId,
        strategy: &str,
    ) -> Result<SchedulePlan, SchedulerError> {
        let strategy: PlacementStrategy = strategy.parse()?;
        self.schedule(target_id, strategy)
    }
}

//! Roadmap implementation scheduler.
//!
//! Estimates durations from completed work, ranks backlog items, plans
//! minimal reorderings and assigns non-overlapping start/finish dates under a
//! single-resource model. Python bindings are exposed as `roadmap_scheduler`.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::prelude::*;
use std::collections::HashMap;

pub mod assigner;
mod config;
pub mod estimator;
pub mod logging;
mod models;
pub mod planner;
mod roadmap;
pub mod scoring;

pub use assigner::{assign_dates, Cursor};
pub use config::{PlacementStrategy, SchedulerConfig, DEFAULT_FALLBACK_DAYS};
pub use estimator::{
    estimate, median, samples_from_items, Confidence, DurationEstimate, DurationEstimator,
    EstimateBasis, HistoricalSample,
};
pub use models::{
    inclusive_days, ChangeReason, ItemId, LifecycleState, Milestone, OrderMove, ScheduleChange,
    Scope, WorkItem, WorkStatus, WorkType,
};
pub use planner::{plan, OrderPlan};
pub use roadmap::{place_target, RoadmapScheduler, SchedulePlan, SchedulerError};
pub use scoring::{rank_items, score, RankKey};

fn to_py_err(err: SchedulerError) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(err.to_string())
}

/// Work item as supplied by the tracking service (PyO3 wrapper).
///
/// Labels stay as strings here; they are resolved when the item enters the
/// scheduler, with unknown labels treated as absent.
#[pyclass(name = "WorkItem")]
#[derive(Clone, Debug)]
pub struct PyWorkItem {
    #[pyo3(get, set)]
    pub id: ItemId,
    #[pyo3(get, set)]
    pub title: String,
    #[pyo3(get, set)]
    pub scope: Option<String>,
    #[pyo3(get, set)]
    pub type_label: Option<String>,
    #[pyo3(get, set)]
    pub milestone: Option<String>,
    #[pyo3(get, set)]
    pub lifecycle: String,
    #[pyo3(get, set)]
    pub status: String,
    #[pyo3(get, set)]
    pub order: Option<u32>,
    #[pyo3(get, set)]
    pub start: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub finish: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub created_on: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub closed_on: Option<NaiveDate>,
}

#[pymethods]
impl PyWorkItem {
    #[new]
    #[pyo3(signature = (
        id,
        title=String::new(),
        scope=None,
        type_label=None,
        milestone=None,
        lifecycle="open".to_string(),
        status="not-started".to_string(),
        order=None,
        start=None,
        finish=None,
        created_on=None,
        closed_on=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: ItemId,
        title: String,
        scope: Option<String>,
        type_label: Option<String>,
        milestone: Option<String>,
        lifecycle: String,
        status: String,
        order: Option<u32>,
        start: Option<NaiveDate>,
        finish: Option<NaiveDate>,
        created_on: Option<NaiveDate>,
        closed_on: Option<NaiveDate>,
    ) -> Self {
        Self {
            id,
            title,
            scope,
            type_label,
            milestone,
            lifecycle,
            status,
            order,
            start,
            finish,
            created_on,
            closed_on,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "WorkItem(id={}, scope={:?}, type={:?}, status={:?}, order={:?})",
            self.id, self.scope, self.type_label, self.status, self.order
        )
    }
}

impl PyWorkItem {
    fn to_model(&self, verbosity: u8) -> Result<WorkItem, SchedulerError> {
        let context = format!("#{}", self.id);
        let scope = resolve_scope(self.scope.as_deref(), &context, verbosity);
        let work_type = resolve_type(self.type_label.as_deref(), &context, verbosity);

        Ok(WorkItem {
            id: self.id,
            title: self.title.clone(),
            scope,
            work_type,
            milestone: self.milestone.as_deref().and_then(Milestone::parse),
            lifecycle: self.lifecycle.parse()?,
            status: WorkStatus::parse(&self.status),
            order: self.order,
            start: self.start,
            finish: self.finish,
            created_on: self.created_on,
            closed_on: self.closed_on,
        })
    }
}

/// Resolve a scope label; unknown labels become absent.
fn resolve_scope(label: Option<&str>, context: &str, verbosity: u8) -> Option<Scope> {
    let label = label?;
    let parsed = Scope::parse(label);
    if parsed.is_none() {
        log_checks!(verbosity, "{}: unknown scope label {:?}", context, label);
    }
    parsed
}

/// Resolve a type label; unknown labels become absent.
fn resolve_type(label: Option<&str>, context: &str, verbosity: u8) -> Option<WorkType> {
    let label = label?;
    let parsed = WorkType::parse(label);
    if parsed.is_none() {
        log_checks!(verbosity, "{}: unknown type label {:?}", context, label);
    }
    parsed
}

fn to_models(items: &[PyWorkItem], verbosity: u8) -> PyResult<Vec<WorkItem>> {
    items
        .iter()
        .map(|item| item.to_model(verbosity))
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_py_err)
}

/// Duration estimate (PyO3 wrapper).
#[pyclass(name = "DurationEstimate")]
#[derive(Clone, Debug)]
pub struct PyDurationEstimate {
    #[pyo3(get)]
    pub duration_days: u32,
    #[pyo3(get)]
    pub confidence: String,
    #[pyo3(get)]
    pub basis: String,
    #[pyo3(get)]
    pub sample_size: usize,
}

#[pymethods]
impl PyDurationEstimate {
    fn __repr__(&self) -> String {
        format!(
            "DurationEstimate(duration_days={}, confidence={:?}, basis={:?}, sample_size={})",
            self.duration_days, self.confidence, self.basis, self.sample_size
        )
    }
}

impl From<DurationEstimate> for PyDurationEstimate {
    fn from(est: DurationEstimate) -> Self {
        Self {
            duration_days: est.duration_days,
            confidence: est.confidence().as_str().to_string(),
            basis: est.basis.as_str().to_string(),
            sample_size: est.sample_size,
        }
    }
}

/// Backlog position change (PyO3 wrapper).
#[pyclass(name = "OrderMove")]
#[derive(Clone, Debug)]
pub struct PyOrderMove {
    #[pyo3(get)]
    pub item_id: ItemId,
    #[pyo3(get)]
    pub old_order: Option<u32>,
    #[pyo3(get)]
    pub new_order: u32,
}

#[pymethods]
impl PyOrderMove {
    fn __repr__(&self) -> String {
        format!(
            "OrderMove(item_id={}, old_order={:?}, new_order={})",
            self.item_id, self.old_order, self.new_order
        )
    }
}

impl From<&OrderMove> for PyOrderMove {
    fn from(m: &OrderMove) -> Self {
        Self {
            item_id: m.item_id,
            old_order: m.old_order,
            new_order: m.new_order,
        }
    }
}

/// Date change for one item (PyO3 wrapper).
#[pyclass(name = "ScheduleChange")]
#[derive(Clone, Debug)]
pub struct PyScheduleChange {
    #[pyo3(get)]
    pub item_id: ItemId,
    #[pyo3(get)]
    pub old_start: Option<NaiveDate>,
    #[pyo3(get)]
    pub old_finish: Option<NaiveDate>,
    #[pyo3(get)]
    pub new_start: NaiveDate,
    #[pyo3(get)]
    pub new_finish: NaiveDate,
    #[pyo3(get)]
    pub reason: String,
}

#[pymethods]
impl PyScheduleChange {
    fn __repr__(&self) -> String {
        format!(
            "ScheduleChange(item_id={}, start={}, finish={}, reason={:?})",
            self.item_id, self.new_start, self.new_finish, self.reason
        )
    }
}

impl From<&ScheduleChange> for PyScheduleChange {
    fn from(c: &ScheduleChange) -> Self {
        Self {
            item_id: c.item_id,
            old_start: c.old_start,
            old_finish: c.old_finish,
            new_start: c.new_start,
            new_finish: c.new_finish,
            reason: c.reason.as_str().to_string(),
        }
    }
}

/// Placement result (PyO3 wrapper).
#[pyclass(name = "OrderPlan")]
#[derive(Clone, Debug)]
pub struct PyOrderPlan {
    #[pyo3(get)]
    pub target_id: ItemId,
    #[pyo3(get)]
    pub strategy: String,
    #[pyo3(get)]
    pub target_position: u32,
    #[pyo3(get)]
    pub desired_order: HashMap<ItemId, u32>,
    #[pyo3(get)]
    pub moves: Vec<PyOrderMove>,
}

#[pymethods]
impl PyOrderPlan {
    fn __repr__(&self) -> String {
        format!(
            "OrderPlan(target_id={}, strategy={:?}, position={}, moves={})",
            self.target_id,
            self.strategy,
            self.target_position,
            self.moves.len()
        )
    }
}

impl From<OrderPlan> for PyOrderPlan {
    fn from(plan: OrderPlan) -> Self {
        Self {
            target_id: plan.target_id,
            strategy: plan.strategy.to_string(),
            target_position: plan.target_position,
            desired_order: plan.desired_order.into_iter().collect(),
            moves: plan.moves.iter().map(PyOrderMove::from).collect(),
        }
    }
}

/// Full run result (PyO3 wrapper).
#[pyclass(name = "SchedulePlan")]
#[derive(Clone, Debug)]
pub struct PySchedulePlan {
    plan: SchedulePlan,
}

#[pymethods]
impl PySchedulePlan {
    #[getter]
    fn order_moves(&self) -> Vec<PyOrderMove> {
        self.plan.order_moves.iter().map(PyOrderMove::from).collect()
    }

    #[getter]
    fn date_changes(&self) -> Vec<PyScheduleChange> {
        self.plan
            .date_changes
            .iter()
            .map(PyScheduleChange::from)
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }

    fn __str__(&self) -> String {
        self.plan.to_string()
    }

    fn __repr__(&self) -> String {
        format!(
            "SchedulePlan(order_moves={}, date_changes={})",
            self.plan.order_moves.len(),
            self.plan.date_changes.len()
        )
    }
}

/// Estimate a duration for a classification from a set of items.
///
/// Closed items in `history` become samples; open items are ignored.
#[pyfunction]
#[pyo3(signature = (
    history,
    scope=None,
    type_label=None,
    fallback_days=DEFAULT_FALLBACK_DAYS,
    verbosity=0
))]
fn estimate_duration(
    history: Vec<PyWorkItem>,
    scope: Option<String>,
    type_label: Option<String>,
    fallback_days: u32,
    verbosity: u8,
) -> PyResult<PyDurationEstimate> {
    let items = to_models(&history, verbosity)?;
    let samples = samples_from_items(&items);
    Ok(estimate(
        &samples,
        resolve_scope(scope.as_deref(), "estimate", verbosity),
        resolve_type(type_label.as_deref(), "estimate", verbosity),
        fallback_days,
    )
    .into())
}

/// Priority score of a single item.
#[pyfunction]
fn score_item(item: PyWorkItem) -> PyResult<i32> {
    let item = item.to_model(0).map_err(to_py_err)?;
    Ok(score(&item))
}

/// Plan the backlog placement of `target_id`.
///
/// # Raises
/// * ValueError if the strategy is unknown, or the target is missing or finished
#[pyfunction]
#[pyo3(signature = (items, target_id, strategy="auto", verbosity=0))]
fn plan_order(
    items: Vec<PyWorkItem>,
    target_id: ItemId,
    strategy: &str,
    verbosity: u8,
) -> PyResult<PyOrderPlan> {
    let strategy: PlacementStrategy = strategy.parse().map_err(to_py_err)?;
    let items = to_models(&items, verbosity)?;
    place_target(&items, target_id, strategy, verbosity)
        .map(PyOrderPlan::from)
        .map_err(to_py_err)
}

/// Reassign dates for the snapshot as ordered.
#[pyfunction]
#[pyo3(name = "assign_dates", signature = (items, today, config=None))]
fn py_assign_dates(
    items: Vec<PyWorkItem>,
    today: NaiveDate,
    config: Option<SchedulerConfig>,
) -> PyResult<Vec<PyScheduleChange>> {
    let config = config.unwrap_or_default();
    let items = to_models(&items, config.verbosity)?;
    let scheduler = RoadmapScheduler::new(items, today, config);
    Ok(scheduler
        .reschedule()
        .iter()
        .map(PyScheduleChange::from)
        .collect())
}

/// Place `target_id` and reassign dates in one run.
///
/// # Raises
/// * ValueError on unknown strategy, bad lifecycle state, or a target that is
///   missing or finished
#[pyfunction]
#[pyo3(signature = (items, target_id, today, strategy="auto", config=None))]
fn schedule_roadmap(
    items: Vec<PyWorkItem>,
    target_id: ItemId,
    today: NaiveDate,
    strategy: &str,
    config: Option<SchedulerConfig>,
) -> PyResult<PySchedulePlan> {
    let config = config.unwrap_or_default();
    let items = to_models(&items, config.verbosity)?;
    let scheduler = RoadmapScheduler::new(items, today, config);
    let plan = scheduler
        .schedule_named(target_id, strategy)
        .map_err(to_py_err)?;
    Ok(PySchedulePlan { plan })
}

/// The roadmap_scheduler Python module.
#[pymodule]
fn roadmap_scheduler(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Data types
    m.add_class::<PyWorkItem>()?;
    m.add_class::<PyDurationEstimate>()?;
    m.add_class::<PyOrderMove>()?;
    m.add_class::<PyScheduleChange>()?;
    m.add_class::<PyOrderPlan>()?;
    m.add_class::<PySchedulePlan>()?;

    // Config
    m.add_class::<SchedulerConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(estimate_duration, m)?)?;
    m.add_function(wrap_pyfunction!(score_item, m)?)?;
    m.add_function(wrap_pyfunction!(plan_order, m)?)?;
    m.add_function(wrap_pyfunction!(py_assign_dates, m)?)?;
    m.add_function(wrap_pyfunction!(schedule_roadmap, m)?)?;

    Ok(())
}

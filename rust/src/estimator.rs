//! Duration estimation from historical completion data.
//!
//! Estimates fall through three tiers by sample count: exact scope+type key,
//! scope only, then the whole history. Below all thresholds a fixed fallback
//! is used.

use rustc_hash::FxHashMap;

use crate::models::{inclusive_days, LifecycleState, Scope, WorkItem, WorkType};
use crate::log_debug;

/// Samples needed for a scope+type estimate.
pub const EXACT_KEY_MIN_SAMPLES: usize = 5;
/// Samples needed for a scope-only estimate.
pub const SCOPE_MIN_SAMPLES: usize = 3;
/// Samples needed for a global estimate.
pub const GLOBAL_MIN_SAMPLES: usize = 10;

/// How much to trust an estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Which sample group an estimate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EstimateBasis {
    ScopeType,
    Scope,
    Global,
    Fallback,
}

impl EstimateBasis {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScopeType => "scope-type",
            Self::Scope => "scope",
            Self::Global => "global",
            Self::Fallback => "fallback",
        }
    }

    /// Confidence is a function of the tier, which is a function of sample count.
    pub fn confidence(self) -> Confidence {
        match self {
            Self::ScopeType => Confidence::High,
            Self::Scope | Self::Global => Confidence::Medium,
            Self::Fallback => Confidence::Low,
        }
    }
}

/// Completed-work duration for one classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoricalSample {
    pub scope: Option<Scope>,
    pub work_type: Option<WorkType>,
    pub duration_days: u32,
}

impl HistoricalSample {
    /// Derive a sample from a closed item.
    ///
    /// Uses the inclusive start..finish span when both are recorded, otherwise
    /// whole days from creation to closure. Open items and items with no usable
    /// dates yield `None`.
    pub fn from_item(item: &WorkItem) -> Option<Self> {
        if item.lifecycle != LifecycleState::Closed {
            return None;
        }
        let duration_days = match (item.start, item.finish, item.created_on, item.closed_on) {
            (Some(start), Some(finish), _, _) => inclusive_days(start, finish),
            (_, _, Some(created), Some(closed)) => {
                let elapsed = (closed - created).num_days().max(1);
                u32::try_from(elapsed).unwrap_or(u32::MAX)
            }
            _ => return None,
        };
        Some(Self {
            scope: item.scope,
            work_type: item.work_type,
            duration_days,
        })
    }
}

/// Collect samples from every closed item in a snapshot.
pub fn samples_from_items(items: &[WorkItem]) -> Vec<HistoricalSample> {
    items.iter().filter_map(HistoricalSample::from_item).collect()
}

/// A duration estimate with its provenance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DurationEstimate {
    pub duration_days: u32,
    pub basis: EstimateBasis,
    pub sample_size: usize,
}

impl DurationEstimate {
    pub fn confidence(&self) -> Confidence {
        self.basis.confidence()
    }
}

/// Standard median; the midpoint of the two middle values for even counts.
///
/// Returns `None` for an empty slice.
pub fn median(values: &[u32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0)
    } else {
        Some(f64::from(sorted[mid]))
    }
}

/// Median rounded to whole days, half away from zero, at least one day.
fn median_days(values: &[u32]) -> u32 {
    median(values).map_or(1, |m| (m.round() as u32).max(1))
}

/// Estimate a duration from raw samples.
///
/// An absent scope skips the scope tiers; an absent type skips the exact tier.
pub fn estimate(
    samples: &[HistoricalSample],
    scope: Option<Scope>,
    work_type: Option<WorkType>,
    fallback_days: u32,
) -> DurationEstimate {
    let exact: Vec<u32> = match (scope, work_type) {
        (Some(s), Some(t)) => samples
            .iter()
            .filter(|x| x.scope == Some(s) && x.work_type == Some(t))
            .map(|x| x.duration_days)
            .collect(),
        _ => Vec::new(),
    };
    let scoped: Vec<u32> = match scope {
        Some(s) => samples
            .iter()
            .filter(|x| x.scope == Some(s))
            .map(|x| x.duration_days)
            .collect(),
        None => Vec::new(),
    };
    let global: Vec<u32> = samples.iter().map(|x| x.duration_days).collect();
    select_tier(&exact, &scoped, &global, fallback_days)
}

fn select_tier(exact: &[u32], scoped: &[u32], global: &[u32], fallback_days: u32) -> DurationEstimate {
    let (basis, group) = if exact.len() >= EXACT_KEY_MIN_SAMPLES {
        (EstimateBasis::ScopeType, exact)
    } else if scoped.len() >= SCOPE_MIN_SAMPLES {
        (EstimateBasis::Scope, scoped)
    } else if global.len() >= GLOBAL_MIN_SAMPLES {
        (EstimateBasis::Global, global)
    } else {
        return DurationEstimate {
            duration_days: fallback_days.max(1),
            basis: EstimateBasis::Fallback,
            sample_size: global.len(),
        };
    };
    DurationEstimate {
        duration_days: median_days(group),
        basis,
        sample_size: group.len(),
    }
}

/// Estimator over a fixed history, with samples pre-grouped by key.
#[derive(Clone, Debug)]
pub struct DurationEstimator {
    by_key: FxHashMap<(Scope, WorkType), Vec<u32>>,
    by_scope: FxHashMap<Scope, Vec<u32>>,
    global: Vec<u32>,
    fallback_days: u32,
    verbosity: u8,
}

impl DurationEstimator {
    pub fn new(samples: &[HistoricalSample], fallback_days: u32) -> Self {
        let mut by_key: FxHashMap<(Scope, WorkType), Vec<u32>> = FxHashMap::default();
        let mut by_scope: FxHashMap<Scope, Vec<u32>> = FxHashMap::default();
        let mut global = Vec::with_capacity(samples.len());

        for sample in samples {
            global.push(sample.duration_days);
            if let Some(scope) = sample.scope {
                by_scope.entry(scope).or_default().push(sample.duration_days);
                if let Some(work_type) = sample.work_type {
                    by_key
                        .entry((scope, work_type))
                        .or_default()
                        .push(sample.duration_days);
                }
            }
        }

        Self {
            by_key,
            by_scope,
            global,
            fallback_days,
            verbosity: 0,
        }
    }

    /// Build from the closed items of a snapshot.
    pub fn from_items(items: &[WorkItem], fallback_days: u32) -> Self {
        Self::new(&samples_from_items(items), fallback_days)
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn sample_count(&self) -> usize {
        self.global.len()
    }

    pub fn estimate(&self, scope: Option<Scope>, work_type: Option<WorkType>) -> DurationEstimate {
        const EMPTY: &[u32] = &[];
        let exact = match (scope, work_type) {
            (Some(s), Some(t)) => self.by_key.get(&(s, t)).map_or(EMPTY, Vec::as_slice),
            _ => EMPTY,
        };
        let scoped = scope
            .and_then(|s| self.by_scope.get(&s))
            .map_or(EMPTY, Vec::as_slice);

        let result = select_tier(exact, scoped, &self.global, self.fallback_days);
        log_debug!(
            self.verbosity,
            "estimate {:?}/{:?}: exact={} scope={} global={} -> {}d ({}, {})",
            scope,
            work_type,
            exact.len(),
            scoped.len(),
            self.global.len(),
            result.duration_days,
            result.basis.as_str(),
            result.confidence().as_str()
        );
        result
    }

    /// Planned duration for an item's classification.
    pub fn duration_for(&self, item: &WorkItem) -> u32 {
        self.estimate(item.scope, item.work_type).duration_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn sample(scope: Option<Scope>, work_type: Option<WorkType>, days: u32) -> HistoricalSample {
        HistoricalSample {
            scope,
            work_type,
            duration_days: days,
        }
    }

    fn repeat(n: usize, s: HistoricalSample) -> Vec<HistoricalSample> {
        vec![s; n]
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[7]), Some(7.0));
        assert_eq!(median(&[5, 1, 3]), Some(3.0));
        assert_eq!(median(&[4, 1, 3, 2]), Some(2.5));
        assert_eq!(median(&[10, 2]), Some(6.0));
    }

    #[test]
    fn test_fallback_with_no_history() {
        let est = estimate(&[], Some(Scope::Core), Some(WorkType::Feature), 2);
        assert_eq!(est.duration_days, 2);
        assert_eq!(est.basis, EstimateBasis::Fallback);
        assert_eq!(est.confidence(), Confidence::Low);
        assert_eq!(est.sample_size, 0);
    }

    #[test]
    fn test_unknown_classification_with_thin_history_falls_back() {
        let samples = repeat(9, sample(Some(Scope::Ai), Some(WorkType::Docs), 4));
        let est = estimate(&samples, None, None, 2);
        assert_eq!(est.duration_days, 2);
        assert_eq!(est.confidence(), Confidence::Low);
        assert_eq!(est.basis, EstimateBasis::Fallback);
    }

    #[test]
    fn test_exact_tier_boundary() {
        let s = sample(Some(Scope::Core), Some(WorkType::Feature), 6);
        let four = repeat(4, s);
        let est = estimate(&four, Some(Scope::Core), Some(WorkType::Feature), 2);
        assert_ne!(est.confidence(), Confidence::High);
        // 4 samples still satisfy the scope tier
        assert_eq!(est.basis, EstimateBasis::Scope);

        let five = repeat(5, s);
        let est = estimate(&five, Some(Scope::Core), Some(WorkType::Feature), 2);
        assert_eq!(est.confidence(), Confidence::High);
        assert_eq!(est.basis, EstimateBasis::ScopeType);
        assert_eq!(est.duration_days, 6);
        assert_eq!(est.sample_size, 5);
    }

    #[test]
    fn test_scope_tier_boundary() {
        let s = sample(Some(Scope::World), Some(WorkType::Infra), 3);
        let two = repeat(2, s);
        let est = estimate(&two, Some(Scope::World), Some(WorkType::Feature), 2);
        assert_eq!(est.basis, EstimateBasis::Fallback);

        let three = repeat(3, s);
        let est = estimate(&three, Some(Scope::World), Some(WorkType::Feature), 2);
        assert_eq!(est.basis, EstimateBasis::Scope);
        assert_eq!(est.confidence(), Confidence::Medium);
        assert_eq!(est.duration_days, 3);
    }

    #[test]
    fn test_global_tier_boundary() {
        let s = sample(Some(Scope::Mcp), Some(WorkType::Test), 5);
        let nine = repeat(9, s);
        let est = estimate(&nine, Some(Scope::Core), None, 2);
        assert_eq!(est.basis, EstimateBasis::Fallback);

        let ten = repeat(10, s);
        let est = estimate(&ten, Some(Scope::Core), None, 2);
        assert_eq!(est.basis, EstimateBasis::Global);
        assert_eq!(est.confidence(), Confidence::Medium);
        assert_eq!(est.duration_days, 5);
        assert_eq!(est.sample_size, 10);
    }

    #[test]
    fn test_even_median_rounds_half_up() {
        let samples = vec![
            sample(Some(Scope::Ai), None, 2),
            sample(Some(Scope::Ai), None, 3),
            sample(Some(Scope::Ai), None, 1),
            sample(Some(Scope::Ai), None, 4),
        ];
        // median 2.5 -> 3
        let est = estimate(&samples, Some(Scope::Ai), None, 2);
        assert_eq!(est.basis, EstimateBasis::Scope);
        assert_eq!(est.duration_days, 3);
    }

    #[test]
    fn test_grouped_estimator_matches_free_function() {
        let mut samples = repeat(5, sample(Some(Scope::Core), Some(WorkType::Feature), 8));
        samples.extend(repeat(3, sample(Some(Scope::Systems), Some(WorkType::Docs), 2)));
        samples.extend(repeat(4, sample(None, None, 1)));
        let estimator = DurationEstimator::new(&samples, 2);

        for (scope, work_type) in [
            (Some(Scope::Core), Some(WorkType::Feature)),
            (Some(Scope::Core), Some(WorkType::Docs)),
            (Some(Scope::Systems), None),
            (None, None),
            (Some(Scope::Devx), Some(WorkType::Spike)),
        ] {
            assert_eq!(
                estimator.estimate(scope, work_type),
                estimate(&samples, scope, work_type, 2)
            );
        }
        assert_eq!(estimator.sample_count(), 12);
    }

    #[test]
    fn test_sample_from_dates_and_creation() {
        let mut item = WorkItem::new(1, "done");
        item.lifecycle = LifecycleState::Closed;
        item.scope = Some(Scope::Core);
        item.start = Some(d(2024, 3, 1));
        item.finish = Some(d(2024, 3, 4));
        assert_eq!(HistoricalSample::from_item(&item).unwrap().duration_days, 4);

        item.start = None;
        item.finish = None;
        item.created_on = Some(d(2024, 3, 1));
        item.closed_on = Some(d(2024, 3, 11));
        assert_eq!(HistoricalSample::from_item(&item).unwrap().duration_days, 10);

        // Same-day closure clamps to one day
        item.closed_on = Some(d(2024, 3, 1));
        assert_eq!(HistoricalSample::from_item(&item).unwrap().duration_days, 1);
    }

    #[test]
    fn test_open_or_undated_items_are_not_samples() {
        let mut item = WorkItem::new(1, "open");
        item.start = Some(d(2024, 3, 1));
        item.finish = Some(d(2024, 3, 4));
        assert!(HistoricalSample::from_item(&item).is_none());

        let mut closed = WorkItem::new(2, "no dates");
        closed.lifecycle = LifecycleState::Closed;
        assert!(HistoricalSample::from_item(&closed).is_none());

        assert!(samples_from_items(&[item, closed]).is_empty());
    }
}

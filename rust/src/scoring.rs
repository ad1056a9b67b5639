//! Priority scoring for backlog items.
//!
//! Score = scope weight + type weight + milestone weight. Absent labels
//! contribute nothing.

use std::cmp::{Ordering, Reverse};

use crate::models::{ItemId, Milestone, Scope, WorkItem, WorkType};

/// Weight for a scope: 100 at the top of the list, minus 8 per rank.
pub fn scope_weight(scope: Option<Scope>) -> i32 {
    scope.map_or(0, |s| 100 - 8 * s.rank() as i32)
}

pub fn type_weight(work_type: Option<WorkType>) -> i32 {
    match work_type {
        Some(WorkType::Feature) => 50,
        Some(WorkType::Security) => 45,
        Some(WorkType::Infra) => 40,
        Some(WorkType::Enhancement) => 30,
        Some(WorkType::Spike) => 25,
        Some(WorkType::Refactor) => 20,
        Some(WorkType::Docs) | Some(WorkType::Test) => 10,
        None => 0,
    }
}

/// Weight for a milestone: `120 - 10n`, so M0 = 120, M1 = 110, ...
pub fn milestone_weight(milestone: Option<Milestone>) -> i32 {
    milestone.map_or(0, |Milestone(n)| {
        let n = i32::try_from(n).unwrap_or(i32::MAX);
        120i32.saturating_sub(n.saturating_mul(10))
    })
}

/// Priority score of an item. Higher ranks earlier.
pub fn score(item: &WorkItem) -> i32 {
    scope_weight(item.scope) + type_weight(item.work_type) + milestone_weight(item.milestone)
}

/// Total ordering key for ranking items (lower = earlier in the backlog).
///
/// Ties on score prefer the prior recorded order; items that have one come
/// before items that do not, and the item id settles whatever remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankKey {
    neg_score: Reverse<i32>,
    unordered: bool,
    order: u32,
    id: ItemId,
}

impl RankKey {
    pub fn new(item: &WorkItem) -> Self {
        Self::with_score(item, score(item))
    }

    pub fn with_score(item: &WorkItem, score: i32) -> Self {
        Self {
            neg_score: Reverse(score),
            unordered: item.order.is_none(),
            order: item.order.unwrap_or(0),
            id: item.id,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn score(&self) -> i32 {
        self.neg_score.0
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.neg_score
            .cmp(&other.neg_score)
            .then(self.unordered.cmp(&other.unordered))
            .then(self.order.cmp(&other.order))
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Item ids ranked by score, highest first.
pub fn rank_items(items: &[WorkItem]) -> Vec<ItemId> {
    let mut keys: Vec<RankKey> = items.iter().map(RankKey::new).collect();
    keys.sort();
    keys.into_iter().map(|k| k.id()).collect()
}

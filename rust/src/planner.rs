//! Backlog placement planning.
//!
//! Computes where a target item belongs and reports only the positions that
//! actually change, so the caller writes as little as possible back to the
//! tracking service.

use rustc_hash::FxHashMap;

use crate::config::PlacementStrategy;
use crate::models::{ItemId, OrderMove, WorkItem};
use crate::scoring::RankKey;
use crate::{log_changes, log_checks};

/// Result of placing one target item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderPlan {
    pub target_id: ItemId,
    pub strategy: PlacementStrategy,
    /// Position the target ends up at.
    pub target_position: u32,
    /// Desired position of every positioned item after the move.
    pub desired_order: FxHashMap<ItemId, u32>,
    /// Items whose position differs from the recorded one, by new position.
    pub moves: Vec<OrderMove>,
}

impl OrderPlan {
    pub fn is_noop(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Plan the placement of `target` within `current`.
///
/// `target` may or may not already be part of `current` (matched by id). When
/// it is not, its insertion is always reported as a move.
pub fn plan(
    current: &[WorkItem],
    target: &WorkItem,
    strategy: PlacementStrategy,
    verbosity: u8,
) -> OrderPlan {
    let existing = current.iter().find(|item| item.id == target.id);
    let old_target_order = existing.map_or(target.order, |item| item.order);
    let others: Vec<&WorkItem> = current.iter().filter(|item| item.id != target.id).collect();

    let (target_position, desired_order) = match strategy {
        PlacementStrategy::Auto => place_auto(&others, target, old_target_order),
        PlacementStrategy::Append => place_append(&others, target.id),
        PlacementStrategy::ScopeBlock => {
            place_scope_block(&others, target, old_target_order, verbosity)
        }
    };

    let mut moves: Vec<OrderMove> = Vec::new();
    for (&item_id, &new_order) in &desired_order {
        let old_order = if item_id == target.id {
            old_target_order
        } else {
            others
                .iter()
                .find(|item| item.id == item_id)
                .and_then(|item| item.order)
        };
        let is_new_target = item_id == target.id && existing.is_none();
        if is_new_target || old_order != Some(new_order) {
            moves.push(OrderMove {
                item_id,
                old_order,
                new_order,
            });
        }
    }
    moves.sort_by_key(|m| (m.new_order, m.item_id));

    for m in &moves {
        log_changes!(verbosity, "{}", m);
    }

    OrderPlan {
        target_id: target.id,
        strategy,
        target_position,
        desired_order,
        moves,
    }
}

/// Full recompute: rank everything by score and renumber from 1.
fn place_auto(
    others: &[&WorkItem],
    target: &WorkItem,
    old_target_order: Option<u32>,
) -> (u32, FxHashMap<ItemId, u32>) {
    let mut keyed_target = target.clone();
    keyed_target.order = old_target_order;

    let mut keys: Vec<RankKey> = others.iter().map(|item| RankKey::new(item)).collect();
    keys.push(RankKey::new(&keyed_target));
    keys.sort();

    let mut desired: FxHashMap<ItemId, u32> =
        FxHashMap::with_capacity_and_hasher(keys.len(), Default::default());
    let mut target_position = 0;
    for (position, key) in (1u32..).zip(keys.iter()) {
        if key.id() == target.id {
            target_position = position;
        }
        desired.insert(key.id(), position);
    }
    (target_position, desired)
}

/// Positions of the other items as currently recorded.
fn recorded_positions(others: &[&WorkItem]) -> FxHashMap<ItemId, u32> {
    others
        .iter()
        .filter_map(|item| item.order.map(|order| (item.id, order)))
        .collect()
}

/// One past the end of the backlog.
fn end_position(others: &[&WorkItem], positions: &FxHashMap<ItemId, u32>) -> u32 {
    let count = u32::try_from(others.len()).unwrap_or(u32::MAX);
    let highest = positions.values().copied().max().unwrap_or(0);
    count.max(highest).saturating_add(1)
}

fn place_append(others: &[&WorkItem], target_id: ItemId) -> (u32, FxHashMap<ItemId, u32>) {
    let mut positions = recorded_positions(others);
    let position = end_position(others, &positions);
    positions.insert(target_id, position);
    (position, positions)
}

/// Insert right after the last item sharing the target's scope.
fn place_scope_block(
    others: &[&WorkItem],
    target: &WorkItem,
    old_target_order: Option<u32>,
    verbosity: u8,
) -> (u32, FxHashMap<ItemId, u32>) {
    let Some(scope) = target.scope else {
        log_checks!(verbosity, "#{} has no scope, appending", target.id);
        return place_append(others, target.id);
    };

    let mut positions = recorded_positions(others);

    // Close the gap left by the target's old slot before reinserting it
    if let Some(old) = old_target_order {
        for position in positions.values_mut() {
            if *position > old {
                *position -= 1;
            }
        }
    }

    let anchor = others
        .iter()
        .filter(|item| item.scope == Some(scope))
        .filter_map(|item| positions.get(&item.id).map(|&p| (p, item.id)))
        .max();

    let Some((anchor_position, anchor_id)) = anchor else {
        log_checks!(verbosity, "no {} items in backlog, appending #{}", scope, target.id);
        return place_append(others, target.id);
    };

    let position = anchor_position + 1;
    log_checks!(
        verbosity,
        "#{} goes after #{} ({} block) at {}",
        target.id,
        anchor_id,
        scope,
        position
    );
    for p in positions.values_mut() {
        if *p >= position {
            *p += 1;
        }
    }
    positions.insert(target.id, position);
    (position, positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Milestone, Scope, WorkType};

    fn make_item(
        id: ItemId,
        scope: Option<Scope>,
        work_type: Option<WorkType>,
        milestone: Option<u32>,
        order: Option<u32>,
    ) -> WorkItem {
        WorkItem {
            scope,
            work_type,
            milestone: milestone.map(Milestone),
            order,
            ..WorkItem::new(id, format!("item {id}"))
        }
    }

    fn moved_ids(plan: &OrderPlan) -> Vec<ItemId> {
        plan.moves.iter().map(|m| m.item_id).collect()
    }

    #[test]
    fn test_new_backlog_single_item() {
        let target = make_item(1, Some(Scope::Core), Some(WorkType::Feature), Some(0), None);
        let result = plan(&[], &target, PlacementStrategy::Auto, 0);

        assert_eq!(result.target_position, 1);
        assert_eq!(
            result.moves,
            vec![OrderMove {
                item_id: 1,
                old_order: None,
                new_order: 1
            }]
        );
    }

    #[test]
    fn test_append_leaves_others_alone() {
        let current = vec![
            make_item(1, Some(Scope::Devx), None, None, Some(1)),
            make_item(2, Some(Scope::Ai), None, None, Some(2)),
        ];
        let target = make_item(3, Some(Scope::Core), Some(WorkType::Feature), Some(0), None);
        let result = plan(&current, &target, PlacementStrategy::Append, 0);

        assert_eq!(result.target_position, 3);
        assert_eq!(moved_ids(&result), vec![3]);
        assert_eq!(result.desired_order.get(&1), Some(&1));
    }

    #[test]
    fn test_append_existing_tail_is_noop() {
        let current = vec![
            make_item(1, None, None, None, Some(1)),
            make_item(2, None, None, None, Some(2)),
        ];
        let result = plan(&current, &current[1], PlacementStrategy::Append, 0);
        assert_eq!(result.target_position, 2);
        assert!(result.is_noop());
    }

    #[test]
    fn test_scope_block_inserts_after_last_same_scope() {
        let current = vec![
            make_item(1, Some(Scope::Core), None, None, Some(1)),
            make_item(2, Some(Scope::Core), None, None, Some(2)),
            make_item(3, Some(Scope::Ai), None, None, Some(3)),
            make_item(4, Some(Scope::Devx), None, None, Some(4)),
        ];
        let target = make_item(5, Some(Scope::Core), Some(WorkType::Docs), None, None);
        let result = plan(&current, &target, PlacementStrategy::ScopeBlock, 0);

        assert_eq!(result.target_position, 3);
        // 3 and 4 shift down, 1 and 2 untouched
        assert_eq!(moved_ids(&result), vec![5, 3, 4]);
        assert_eq!(result.desired_order.get(&3), Some(&4));
        assert_eq!(result.desired_order.get(&4), Some(&5));
        assert_eq!(result.desired_order.get(&2), Some(&2));
    }

    #[test]
    fn test_scope_block_without_scope_match_appends() {
        let current = vec![
            make_item(1, Some(Scope::Core), None, None, Some(1)),
            make_item(2, Some(Scope::Ai), None, None, Some(2)),
        ];
        let target = make_item(9, Some(Scope::Security), None, None, None);
        let result = plan(&current, &target, PlacementStrategy::ScopeBlock, 0);
        assert_eq!(result.target_position, 3);
        assert_eq!(moved_ids(&result), vec![9]);
    }

    #[test]
    fn test_scope_block_already_in_place_is_noop() {
        let current = vec![
            make_item(1, Some(Scope::Core), None, None, Some(1)),
            make_item(2, Some(Scope::Core), None, None, Some(2)),
            make_item(3, Some(Scope::Ai), None, None, Some(3)),
        ];
        let result = plan(&current, &current[1], PlacementStrategy::ScopeBlock, 0);
        assert_eq!(result.target_position, 2);
        assert!(result.is_noop());
    }

    #[test]
    fn test_scope_block_moves_existing_target_up() {
        let current = vec![
            make_item(1, Some(Scope::Core), None, None, Some(1)),
            make_item(2, Some(Scope::Ai), None, None, Some(2)),
            make_item(3, Some(Scope::Devx), None, None, Some(3)),
            make_item(4, Some(Scope::Core), None, None, Some(4)),
        ];
        let result = plan(&current, &current[3], PlacementStrategy::ScopeBlock, 0);
        assert_eq!(result.target_position, 2);
        assert_eq!(result.desired_order.get(&1), Some(&1));
        assert_eq!(result.desired_order.get(&2), Some(&3));
        assert_eq!(result.desired_order.get(&3), Some(&4));
        assert_eq!(moved_ids(&result), vec![4, 2, 3]);
    }

    #[test]
    fn test_auto_reorders_by_score() {
        let current = vec![
            make_item(1, Some(Scope::Devx), Some(WorkType::Docs), None, Some(1)),
            make_item(2, Some(Scope::Ai), Some(WorkType::Feature), None, Some(2)),
        ];
        let target = make_item(3, Some(Scope::Core), Some(WorkType::Feature), Some(0), None);
        let result = plan(&current, &target, PlacementStrategy::Auto, 0);

        assert_eq!(result.target_position, 1);
        assert_eq!(result.desired_order.get(&2), Some(&2));
        assert_eq!(result.desired_order.get(&1), Some(&3));
        // Item 2 keeps position 2, so it is not reported
        assert_eq!(moved_ids(&result), vec![3, 1]);
    }

    #[test]
    fn test_auto_noop_when_already_ranked() {
        let current = vec![
            make_item(1, Some(Scope::Core), Some(WorkType::Feature), None, Some(1)),
            make_item(2, Some(Scope::Ai), None, None, Some(2)),
        ];
        let result = plan(&current, &current[1], PlacementStrategy::Auto, 0);
        assert_eq!(result.target_position, 2);
        assert!(result.is_noop());
    }

    #[test]
    fn test_auto_ties_keep_prior_order() {
        let current = vec![
            make_item(5, Some(Scope::Ai), None, None, Some(1)),
            make_item(2, Some(Scope::Ai), None, None, Some(2)),
        ];
        let target = make_item(1, Some(Scope::Ai), None, None, None);
        let result = plan(&current, &target, PlacementStrategy::Auto, 0);
        assert_eq!(result.desired_order.get(&5), Some(&1));
        assert_eq!(result.desired_order.get(&2), Some(&2));
        assert_eq!(result.target_position, 3);
        assert_eq!(moved_ids(&result), vec![1]);
    }
}

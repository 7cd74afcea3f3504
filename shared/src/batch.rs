//! Batch selection over one `(area, action)` pair.
//!
//! Lines are rebuilt wholesale from every fresh area snapshot; edits never
//! survive a reload. Scan hits work purely against the lines in memory.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::{ActionType, SalId, StockItem};

/// Identifies which snapshot a set of lines was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchKey {
    pub area: String,
    pub action: ActionType,
}

/// One selectable item with its client-side edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionLine {
    pub item: StockItem,
    pub checked: bool,
    pub qty: u32,
    pub damaged_qty: u32,
    /// Eligible quantity when the snapshot was loaded.
    pub max_allowed: u32,
}

impl SelectionLine {
    fn new(item: StockItem, action: ActionType) -> Option<Self> {
        let max_allowed = item.eligible_qty(action);
        (max_allowed > 0).then_some(Self {
            item,
            checked: false,
            qty: max_allowed,
            damaged_qty: 0,
            max_allowed,
        })
    }

    fn set_qty(&mut self, qty: u32) {
        self.qty = qty.clamp(1, self.max_allowed.max(1));
        self.damaged_qty = self.damaged_qty.min(self.qty);
    }

    fn set_damaged(&mut self, damaged: u32) {
        self.damaged_qty = damaged.min(self.qty);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanHit {
    Checked,
    Duplicate,
    NotInList,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSelection {
    action: ActionType,
    area: Option<String>,
    lines: Vec<SelectionLine>,
    loading: bool,
    pub notes: String,
}

impl BatchSelection {
    #[must_use]
    pub fn action(&self) -> ActionType {
        self.action
    }

    #[must_use]
    pub fn area(&self) -> Option<&str> {
        self.area.as_deref()
    }

    #[must_use]
    pub fn lines(&self) -> &[SelectionLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Key for the snapshot the current lines should come from.
    #[must_use]
    pub fn key(&self) -> Option<BatchKey> {
        self.area.as_ref().map(|area| BatchKey {
            area: area.clone(),
            action: self.action,
        })
    }

    /// Selects an area. Returns the key to fetch, or `None` when the area was
    /// cleared.
    pub fn set_area(&mut self, area: Option<String>) -> Option<BatchKey> {
        self.area = area.map(|a| a.trim().to_string()).filter(|a| !a.is_empty());
        self.begin_reload()
    }

    /// Switching action discards every edit: the eligible set differs.
    pub fn set_action(&mut self, action: ActionType) -> Option<BatchKey> {
        self.action = action;
        self.begin_reload()
    }

    /// Drops the current lines and returns the key of the snapshot to fetch.
    pub fn begin_reload(&mut self) -> Option<BatchKey> {
        self.lines.clear();
        let key = self.key();
        self.loading = key.is_some();
        key
    }

    /// Rebuilds the lines from a fresh snapshot. Replies for a key other than
    /// the current one are discarded; returns whether the snapshot was applied.
    pub fn apply_snapshot(&mut self, key: &BatchKey, items: Vec<StockItem>) -> bool {
        if self.key().as_ref() != Some(key) {
            debug!(area = %key.area, action = key.action.as_str(), "discarding stale area items");
            return false;
        }
        let action = self.action;
        self.lines = items
            .into_iter()
            .filter_map(|item| SelectionLine::new(item, action))
            .collect();
        self.loading = false;
        info!(
            area = %key.area,
            action = action.as_str(),
            lines = self.lines.len(),
            "batch lines loaded"
        );
        true
    }

    /// A failed fetch for the current key leaves an empty, re-selectable list.
    pub fn load_failed(&mut self, key: &BatchKey) -> bool {
        if self.key().as_ref() == Some(key) {
            self.loading = false;
            true
        } else {
            false
        }
    }

    pub fn set_checked(&mut self, sal_id: &SalId, checked: bool) {
        if let Some(line) = self.line_mut(sal_id) {
            line.checked = checked;
        }
    }

    pub fn set_qty(&mut self, sal_id: &SalId, qty: u32) {
        if let Some(line) = self.line_mut(sal_id) {
            line.set_qty(qty);
        }
    }

    /// Damaged quantities only exist for returns.
    pub fn set_damaged(&mut self, sal_id: &SalId, damaged: u32) {
        if self.action != ActionType::Return {
            return;
        }
        if let Some(line) = self.line_mut(sal_id) {
            line.set_damaged(damaged);
        }
    }

    pub fn select_all(&mut self, checked: bool) {
        for line in &mut self.lines {
            line.checked = checked;
        }
    }

    pub fn register_scan(&mut self, sal_id: &SalId) -> ScanHit {
        match self.line_mut(sal_id) {
            None => ScanHit::NotInList,
            Some(line) if line.checked => ScanHit::Duplicate,
            Some(line) => {
                line.checked = true;
                ScanHit::Checked
            }
        }
    }

    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.lines.iter().filter(|line| line.checked).count()
    }

    /// Leaving batch mode: drop edits, keep the chosen area and action so
    /// re-entry reloads the same snapshot.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.loading = false;
        self.notes.clear();
    }

    fn line_mut(&mut self, sal_id: &SalId) -> Option<&mut SelectionLine> {
        self.lines.iter_mut().find(|line| &line.item.sal_id == sal_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn item(id: &str, required: u32, dispatched: u32, returned: u32) -> StockItem {
        StockItem {
            sal_id: SalId::new(id),
            area: "Lighting".into(),
            name: format!("Item {id}"),
            purpose: None,
            required_qty: required,
            total_dispatched: dispatched,
            total_returned: returned,
            return_to_source: false,
        }
    }

    fn lighting() -> Vec<StockItem> {
        vec![item("SAL-001", 5, 0, 0), item("SAL-002", 3, 3, 0)]
    }

    fn loaded(action: ActionType, items: Vec<StockItem>) -> BatchSelection {
        let mut batch = BatchSelection::default();
        batch.set_action(action);
        let key = batch.set_area(Some("Lighting".into())).unwrap();
        assert!(batch.apply_snapshot(&key, items));
        batch
    }

    #[test]
    fn dispatch_keeps_only_items_left_to_dispatch() {
        let batch = loaded(ActionType::Dispatch, lighting());
        assert_eq!(batch.lines().len(), 1);
        let line = &batch.lines()[0];
        assert_eq!(line.item.sal_id, SalId::new("SAL-001"));
        assert_eq!(line.qty, 5);
        assert!(!line.checked);
    }

    #[test]
    fn return_keeps_only_outstanding_items() {
        let batch = loaded(ActionType::Return, lighting());
        assert_eq!(batch.lines().len(), 1);
        assert_eq!(batch.lines()[0].item.sal_id, SalId::new("SAL-002"));
        assert_eq!(batch.lines()[0].qty, 3);
    }

    #[test]
    fn reload_with_same_data_is_deterministic() {
        let mut batch = loaded(ActionType::Dispatch, lighting());
        let first = batch.lines().to_vec();
        batch.set_checked(&SalId::new("SAL-001"), true);
        batch.set_qty(&SalId::new("SAL-001"), 2);

        let key = batch.begin_reload().unwrap();
        assert!(batch.lines().is_empty());
        assert!(batch.is_loading());
        batch.apply_snapshot(&key, lighting());
        assert_eq!(batch.lines(), first.as_slice());
    }

    #[test]
    fn switching_action_requires_a_fresh_snapshot() {
        let mut batch = loaded(ActionType::Dispatch, lighting());
        batch.select_all(true);
        let key = batch.set_action(ActionType::Return).unwrap();
        assert_eq!(key.action, ActionType::Return);
        assert!(batch.lines().is_empty());
        assert_eq!(batch.selected_count(), 0);
    }

    #[test]
    fn stale_snapshot_is_ignored() {
        let mut batch = BatchSelection::default();
        let old = batch.set_area(Some("Sound".into())).unwrap();
        let current = batch.set_area(Some("Lighting".into())).unwrap();
        assert!(!batch.apply_snapshot(&old, vec![item("SAL-009", 2, 0, 0)]));
        assert!(batch.lines().is_empty());
        assert!(batch.apply_snapshot(&current, lighting()));
        assert_eq!(batch.lines().len(), 1);
    }

    #[test]
    fn quantities_are_clamped() {
        let mut batch = loaded(ActionType::Return, vec![item("SAL-002", 3, 3, 0)]);
        let id = SalId::new("SAL-002");

        batch.set_qty(&id, 0);
        assert_eq!(batch.lines()[0].qty, 1);
        batch.set_qty(&id, 99);
        assert_eq!(batch.lines()[0].qty, 3);

        batch.set_damaged(&id, 10);
        assert_eq!(batch.lines()[0].damaged_qty, 3);
        batch.set_qty(&id, 2);
        assert_eq!(batch.lines()[0].damaged_qty, 2);
    }

    #[test]
    fn damaged_is_ignored_when_dispatching() {
        let mut batch = loaded(ActionType::Dispatch, lighting());
        batch.set_damaged(&SalId::new("SAL-001"), 2);
        assert_eq!(batch.lines()[0].damaged_qty, 0);
    }

    #[test]
    fn scan_hits_check_then_report_duplicates() {
        let mut batch = loaded(ActionType::Dispatch, lighting());
        let id = SalId::new("SAL-001");

        assert_eq!(batch.register_scan(&id), ScanHit::Checked);
        assert_eq!(batch.selected_count(), 1);
        assert_eq!(batch.register_scan(&id), ScanHit::Duplicate);
        assert_eq!(batch.selected_count(), 1);
        assert_eq!(batch.register_scan(&SalId::new("SAL-002")), ScanHit::NotInList);
        assert_eq!(batch.selected_count(), 1);
    }

    #[test]
    fn edits_touch_one_line_only() {
        let mut batch = loaded(
            ActionType::Dispatch,
            vec![item("SAL-001", 5, 0, 0), item("SAL-003", 4, 1, 0)],
        );
        batch.set_checked(&SalId::new("SAL-003"), true);
        batch.set_qty(&SalId::new("SAL-003"), 1);
        assert!(!batch.lines()[0].checked);
        assert_eq!(batch.lines()[0].qty, 5);
        assert_eq!(batch.lines()[1].qty, 1);
    }

    #[test]
    fn clear_keeps_area_and_action() {
        let mut batch = loaded(ActionType::Return, lighting());
        batch.notes = "late truck".into();
        batch.clear();
        assert!(batch.lines().is_empty());
        assert!(batch.notes.is_empty());
        assert_eq!(
            batch.key(),
            Some(BatchKey {
                area: "Lighting".into(),
                action: ActionType::Return
            })
        );
    }

    proptest! {
        #[test]
        fn selected_count_tracks_mutations(ops in prop::collection::vec((0usize..4, any::<bool>()), 0..40)) {
            let items: Vec<StockItem> = (1..=4)
                .map(|n| item(&format!("SAL-00{n}"), 5, 0, 0))
                .collect();
            let mut batch = loaded(ActionType::Dispatch, items);
            let mut expected = [false; 4];

            for (index, flag) in ops {
                let id = SalId::new(format!("SAL-00{}", index + 1));
                if flag {
                    batch.set_checked(&id, !expected[index]);
                    expected[index] = !expected[index];
                } else if batch.register_scan(&id) == ScanHit::Checked {
                    expected[index] = true;
                }
                prop_assert_eq!(batch.selected_count(), expected.iter().filter(|c| **c).count());
            }
        }

        #[test]
        fn quantities_stay_in_bounds(qty in any::<u32>(), damaged in any::<u32>()) {
            let mut batch = loaded(ActionType::Return, vec![item("SAL-001", 9, 7, 2)]);
            let id = SalId::new("SAL-001");
            batch.set_qty(&id, qty);
            batch.set_damaged(&id, damaged);
            let line = &batch.lines()[0];
            prop_assert!((1..=5).contains(&line.qty));
            prop_assert!(line.damaged_qty <= line.qty);
        }
    }
}

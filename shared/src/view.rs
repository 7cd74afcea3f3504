use serde::{Deserialize, Serialize};

use crate::batch::SelectionLine;
use crate::model::{
    ActionType, AreaCache, FormKind, FormRecord, Model, Notice, NoticeKind, StockItem,
};
use crate::mode::Mode;
use crate::session::SessionState;
use crate::submit::{Confirmation, Surface};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ItemView {
    pub sal_id: String,
    pub area: String,
    pub name: String,
    pub purpose: String,
    pub required_qty: u32,
    pub total_dispatched: u32,
    pub total_returned: u32,
    pub outstanding: u32,
    pub status_label: String,
    pub return_to_source: bool,
}

impl From<&StockItem> for ItemView {
    fn from(item: &StockItem) -> Self {
        Self {
            sal_id: item.sal_id.to_string(),
            area: item.area.clone(),
            name: item.name.clone(),
            purpose: item.purpose.clone().unwrap_or_else(|| "-".into()),
            required_qty: item.required_qty,
            total_dispatched: item.total_dispatched,
            total_returned: item.total_returned,
            outstanding: item.outstanding(),
            status_label: item.dispatch_status().label(),
            return_to_source: item.return_to_source,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SingleViewModel {
    pub looking_up: Option<String>,
    pub item: Option<ItemView>,
    pub action: ActionType,
    pub qty: u32,
    pub max_qty: u32,
    pub show_damaged: bool,
    pub damaged_qty: u32,
    pub notes: String,
    pub submit_label: String,
    pub submitting: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LineView {
    pub sal_id: String,
    pub name: String,
    pub checked: bool,
    pub qty: u32,
    pub max_allowed: u32,
    pub damaged_qty: u32,
}

impl From<&SelectionLine> for LineView {
    fn from(line: &SelectionLine) -> Self {
        Self {
            sal_id: line.item.sal_id.to_string(),
            name: line.item.name.clone(),
            checked: line.checked,
            qty: line.qty,
            max_allowed: line.max_allowed,
            damaged_qty: line.damaged_qty,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchViewModel {
    pub areas: Vec<String>,
    pub areas_loading: bool,
    pub area: Option<String>,
    pub action: ActionType,
    pub loading: bool,
    pub lines: Vec<LineView>,
    pub show_damaged: bool,
    pub selected_count: usize,
    pub all_selected: bool,
    pub notes: String,
    pub submit_label: String,
    pub submit_enabled: bool,
    pub submitting: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FormView {
    pub form_no: String,
    pub kind_label: String,
    pub sal_ids: Vec<String>,
    pub area: String,
    pub total_qty: u32,
    pub damaged_qty: u32,
    pub operator_name: String,
    pub team_member_name: String,
    pub has_signed_copy: bool,
    pub signed_form_url: Option<String>,
}

fn kind_label(kind: Option<FormKind>) -> &'static str {
    match kind {
        Some(FormKind::Dispatch) => "Dispatch",
        Some(FormKind::Return) => "Return",
        Some(FormKind::BulkDispatch) => "Bulk dispatch",
        Some(FormKind::BulkReturn) => "Bulk return",
        None => "Form",
    }
}

impl From<&FormRecord> for FormView {
    fn from(form: &FormRecord) -> Self {
        Self {
            form_no: form.form_no.to_string(),
            kind_label: kind_label(form.kind).into(),
            sal_ids: form.sal_ids.iter().map(ToString::to_string).collect(),
            area: form.area.clone(),
            total_qty: form.total_qty,
            damaged_qty: form.damaged_qty,
            operator_name: form.operator_name.clone(),
            team_member_name: form.team_member_name.clone(),
            has_signed_copy: form.has_signed_copy,
            signed_form_url: form.signed_form_url.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadViewModel {
    pub looking_up: Option<String>,
    pub form: Option<FormView>,
    pub photos: Vec<String>,
    pub max_photos: usize,
    pub notify: bool,
    pub submit_enabled: bool,
    pub submitting: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ViewModel {
    pub mode: Mode,
    /// Set while a mode switch waits for the operator to accept losing photos.
    pub pending_switch: Option<Mode>,
    pub camera_state: SessionState,
    /// The active mode's camera could not be opened; offer manual entry.
    pub manual_entry_only: bool,
    pub operator_name: String,
    pub team_member_name: String,
    pub single: SingleViewModel,
    pub batch: BatchViewModel,
    pub upload: UploadViewModel,
    pub notice: Option<Notice>,
    pub confirmation: Option<Confirmation>,
}

impl ViewModel {
    #[must_use]
    pub fn from_model(model: &Model) -> Self {
        let slot = model.mode.slot();
        let notice = model
            .active_error
            .as_ref()
            .map(|e| Notice::new(e.user_facing_message(), NoticeKind::Error))
            .or_else(|| model.active_notice.clone());

        Self {
            mode: model.mode,
            pending_switch: model.pending_switch,
            camera_state: model.sessions.state(slot),
            manual_entry_only: model.sessions.is_unavailable(slot),
            operator_name: model.actors.operator_name.clone(),
            team_member_name: model.actors.team_member_name.clone(),
            single: single_view(model),
            batch: batch_view(model),
            upload: upload_view(model),
            notice,
            confirmation: model.confirmation.clone(),
        }
    }
}

fn single_view(model: &Model) -> SingleViewModel {
    let single = &model.single;
    let awaiting = single.item.is_none();
    SingleViewModel {
        looking_up: single
            .requested
            .as_ref()
            .filter(|_| awaiting)
            .map(ToString::to_string),
        item: single.item.as_ref().map(ItemView::from),
        action: single.action,
        qty: single.qty,
        max_qty: single
            .item
            .as_ref()
            .map_or(0, |item| item.eligible_qty(single.action)),
        show_damaged: single.action == ActionType::Return,
        damaged_qty: single.damaged_qty,
        notes: single.notes.clone(),
        submit_label: single.action.submit_label().into(),
        submitting: model.latch.is_busy(Surface::Single),
    }
}

fn batch_view(model: &Model) -> BatchViewModel {
    let batch = &model.batch;
    let submitting = model.latch.is_busy(Surface::Bulk);
    let selected_count = batch.selected_count();
    let submit_label = match batch.action() {
        ActionType::Dispatch => format!("Dispatch {selected_count} items"),
        ActionType::Return => format!("Return {selected_count} items"),
    };
    BatchViewModel {
        areas: model.areas.areas().to_vec(),
        areas_loading: model.areas == AreaCache::Loading,
        area: batch.area().map(str::to_string),
        action: batch.action(),
        loading: batch.is_loading(),
        lines: batch.lines().iter().map(LineView::from).collect(),
        show_damaged: batch.action() == ActionType::Return,
        selected_count,
        all_selected: !batch.lines().is_empty() && selected_count == batch.lines().len(),
        notes: batch.notes.clone(),
        submit_label,
        submit_enabled: selected_count > 0 && !submitting,
        submitting,
    }
}

fn upload_view(model: &Model) -> UploadViewModel {
    let upload = &model.upload;
    let submitting = model.latch.is_busy(Surface::Upload);
    UploadViewModel {
        looking_up: upload
            .requested
            .as_ref()
            .filter(|_| upload.form.is_none())
            .map(ToString::to_string),
        form: upload.form.as_ref().map(FormView::from),
        photos: upload
            .pending
            .photos()
            .iter()
            .map(|p| p.data_url.clone())
            .collect(),
        max_photos: model.config.photo.max_photos,
        notify: upload.notify,
        submit_enabled: upload.form.is_some() && !upload.pending.is_empty() && !submitting,
        submitting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SalId;
    use crate::{AppError, ErrorKind};

    fn stock() -> StockItem {
        StockItem {
            sal_id: SalId::new("SAL-001"),
            area: "Lighting".into(),
            name: "Par can".into(),
            purpose: None,
            required_qty: 5,
            total_dispatched: 2,
            total_returned: 1,
            return_to_source: true,
        }
    }

    #[test]
    fn single_item_view_derives_status() {
        let mut model = Model::default();
        model.single.begin_lookup(SalId::new("SAL-001"));
        assert_eq!(
            ViewModel::from_model(&model).single.looking_up.as_deref(),
            Some("SAL-001")
        );

        model.single.show(stock());
        let view = ViewModel::from_model(&model).single;
        assert_eq!(view.looking_up, None);
        let item = view.item.unwrap();
        assert_eq!(item.status_label, "3 remaining");
        assert_eq!(item.purpose, "-");
        assert_eq!(item.outstanding, 1);
        assert_eq!(view.qty, 3);
        assert_eq!(view.submit_label, "Dispatch Item");
        assert!(!view.show_damaged);
    }

    #[test]
    fn error_takes_precedence_over_notice() {
        let mut model = Model::default();
        model.show_notice("Scanned", NoticeKind::Success);
        model.set_error(AppError::new(ErrorKind::Network, "offline"));
        let view = ViewModel::from_model(&model);
        assert_eq!(
            view.notice,
            Some(Notice::new("Network error: offline", NoticeKind::Error))
        );
    }

    #[test]
    fn batch_submit_disabled_without_selection() {
        let model = Model::default();
        let view = ViewModel::from_model(&model).batch;
        assert_eq!(view.selected_count, 0);
        assert!(!view.submit_enabled);
        assert!(!view.all_selected);
        assert_eq!(view.submit_label, "Dispatch 0 items");
    }
}

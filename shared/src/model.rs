use serde::{Deserialize, Serialize};
use std::fmt;

use crate::batch::BatchSelection;
use crate::capabilities::ApiEndpoint;
use crate::config::AppConfig;
use crate::image_processing::PendingUpload;
use crate::mode::Mode;
use crate::session::CameraSessions;
use crate::submit::{Confirmation, SubmitLatch};
use crate::AppError;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(SalId);
typed_id!(FormNumber);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    #[default]
    Dispatch,
    Return,
}

impl ActionType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dispatch => "dispatch",
            Self::Return => "return",
        }
    }

    #[must_use]
    pub const fn bulk_action(self) -> &'static str {
        match self {
            Self::Dispatch => "bulkDispatch",
            Self::Return => "bulkReturn",
        }
    }

    #[must_use]
    pub const fn submit_label(self) -> &'static str {
        match self {
            Self::Dispatch => "Dispatch Item",
            Self::Return => "Return Item",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActorRole {
    Operator,
    TeamMember,
}

impl ActorRole {
    pub const ALL: [ActorRole; 2] = [ActorRole::Operator, ActorRole::TeamMember];
}

/// Display names recorded against every transaction.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Actors {
    pub operator_name: String,
    pub team_member_name: String,
}

impl Actors {
    #[must_use]
    pub fn get(&self, role: ActorRole) -> &str {
        match role {
            ActorRole::Operator => &self.operator_name,
            ActorRole::TeamMember => &self.team_member_name,
        }
    }

    pub fn set(&mut self, role: ActorRole, name: impl Into<String>) {
        match role {
            ActorRole::Operator => self.operator_name = name.into(),
            ActorRole::TeamMember => self.team_member_name = name.into(),
        }
    }
}

/// Read-only snapshot of one spreadsheet row. Never mutated locally.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StockItem {
    pub sal_id: SalId,
    pub area: String,
    pub name: String,
    pub purpose: Option<String>,
    pub required_qty: u32,
    pub total_dispatched: u32,
    pub total_returned: u32,
    pub return_to_source: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchStatus {
    FullyDispatched,
    Partial { remaining: u32 },
    NotDispatched { remaining: u32 },
}

impl DispatchStatus {
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::FullyDispatched => "Fully dispatched".into(),
            Self::Partial { remaining } => format!("{remaining} remaining"),
            Self::NotDispatched { remaining } => format!("{remaining} not dispatched"),
        }
    }
}

impl StockItem {
    #[must_use]
    pub fn remaining_to_dispatch(&self) -> u32 {
        self.required_qty.saturating_sub(self.total_dispatched)
    }

    /// Quantity handed out and not yet back. Saturates at zero when the sheet's
    /// bookkeeping is inconsistent.
    #[must_use]
    pub fn outstanding(&self) -> u32 {
        self.total_dispatched.saturating_sub(self.total_returned)
    }

    #[must_use]
    pub fn eligible_qty(&self, action: ActionType) -> u32 {
        match action {
            ActionType::Dispatch => self.remaining_to_dispatch(),
            ActionType::Return => self.outstanding(),
        }
    }

    #[must_use]
    pub fn dispatch_status(&self) -> DispatchStatus {
        let remaining = self.remaining_to_dispatch();
        if remaining == 0 {
            DispatchStatus::FullyDispatched
        } else if remaining < self.required_qty {
            DispatchStatus::Partial { remaining }
        } else {
            DispatchStatus::NotDispatched { remaining }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormKind {
    Dispatch,
    Return,
    BulkDispatch,
    BulkReturn,
}

impl FormKind {
    /// Kind implied by the printed form number prefix.
    #[must_use]
    pub fn from_number(form_no: &str) -> Option<Self> {
        let prefix = form_no.split('-').next()?;
        match prefix {
            "DF" => Some(Self::Dispatch),
            "RF" => Some(Self::Return),
            "BDF" => Some(Self::BulkDispatch),
            "BRF" => Some(Self::BulkReturn),
            _ => None,
        }
    }

    #[must_use]
    pub const fn action(self) -> ActionType {
        match self {
            Self::Dispatch | Self::BulkDispatch => ActionType::Dispatch,
            Self::Return | Self::BulkReturn => ActionType::Return,
        }
    }

    #[must_use]
    pub const fn is_bulk(self) -> bool {
        matches!(self, Self::BulkDispatch | Self::BulkReturn)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FormRecord {
    pub form_no: FormNumber,
    pub kind: Option<FormKind>,
    pub sal_ids: Vec<SalId>,
    pub area: String,
    pub total_qty: u32,
    pub damaged_qty: u32,
    pub operator_name: String,
    pub team_member_name: String,
    pub has_signed_copy: bool,
    pub signed_form_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
}

impl Notice {
    pub fn new(message: impl Into<String>, kind: NoticeKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

/// Single-item lookup and the form that acts on it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SingleView {
    pub requested: Option<SalId>,
    pub item: Option<StockItem>,
    pub action: ActionType,
    pub qty: u32,
    pub damaged_qty: u32,
    pub notes: String,
}

impl SingleView {
    pub fn begin_lookup(&mut self, sal_id: SalId) {
        self.requested = Some(sal_id);
        self.item = None;
    }

    /// True when a reply for `sal_id` is still the one the operator is waiting on.
    #[must_use]
    pub fn is_awaiting(&self, sal_id: &SalId) -> bool {
        self.requested.as_ref() == Some(sal_id)
    }

    pub fn show(&mut self, item: StockItem) {
        self.item = Some(item);
        self.select_action(ActionType::Dispatch);
    }

    /// Same item refreshed after a submit: keeps the chosen action.
    pub fn refresh(&mut self, item: StockItem) {
        let action = self.action;
        self.item = Some(item);
        self.select_action(action);
    }

    pub fn select_action(&mut self, action: ActionType) {
        self.action = action;
        self.damaged_qty = 0;
        self.qty = self
            .item
            .as_ref()
            .map_or(1, |item| item.eligible_qty(action).max(1));
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadView {
    pub requested: Option<FormNumber>,
    pub form: Option<FormRecord>,
    pub pending: PendingUpload,
    pub notify: bool,
}

impl UploadView {
    #[must_use]
    pub fn is_awaiting(&self, form_no: &FormNumber) -> bool {
        self.requested.as_ref() == Some(form_no)
    }

    pub fn begin_lookup(&mut self, form_no: FormNumber) {
        self.requested = Some(form_no);
        self.form = None;
        self.pending.clear();
    }

    pub fn show(&mut self, form: FormRecord) {
        self.pending.attach(form.form_no.clone());
        self.form = Some(form);
    }

    pub fn clear(&mut self) {
        let notify = self.notify;
        *self = Self::default();
        self.notify = notify;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AreaCache {
    #[default]
    NotLoaded,
    Loading,
    Loaded(Vec<String>),
}

impl AreaCache {
    #[must_use]
    pub fn areas(&self) -> &[String] {
        match self {
            Self::Loaded(areas) => areas,
            Self::NotLoaded | Self::Loading => &[],
        }
    }
}

pub struct Model {
    pub config: AppConfig,
    pub endpoint: ApiEndpoint,
    pub mode: Mode,
    pub pending_switch: Option<Mode>,
    pub sessions: CameraSessions,
    pub single: SingleView,
    pub batch: BatchSelection,
    pub upload: UploadView,
    pub areas: AreaCache,
    pub actors: Actors,
    pub latch: SubmitLatch,
    pub confirmation: Option<Confirmation>,
    pub active_error: Option<AppError>,
    pub active_notice: Option<Notice>,
}

impl Default for Model {
    fn default() -> Self {
        let config = AppConfig::default();
        Self {
            endpoint: ApiEndpoint::fallback(),
            config,
            mode: Mode::default(),
            pending_switch: None,
            sessions: CameraSessions::default(),
            single: SingleView::default(),
            batch: BatchSelection::default(),
            upload: UploadView::default(),
            areas: AreaCache::default(),
            actors: Actors::default(),
            latch: SubmitLatch::default(),
            confirmation: None,
            active_error: None,
            active_notice: None,
        }
    }
}

impl Model {
    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    pub fn show_notice(&mut self, message: impl Into<String>, kind: NoticeKind) {
        self.active_notice = Some(Notice::new(message, kind));
    }

    pub fn clear_notice(&mut self) {
        self.active_notice = None;
    }
}

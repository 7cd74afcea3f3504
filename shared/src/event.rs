use serde::{Deserialize, Serialize};

use crate::batch::BatchKey;
use crate::capabilities::CameraOutput;
use crate::config::AppConfig;
use crate::gateway::GatewayReply;
use crate::model::{ActionType, ActorRole, FormNumber, SalId};
use crate::mode::Mode;
use crate::session::ScanSlot;

/// Result of a key-value read or write, mapped to a crate-owned shape.
pub type StoredName = Result<Option<Vec<u8>>, String>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    AppStarted,
    Configure(AppConfig),
    NameRestored {
        role: ActorRole,
        stored: StoredName,
    },
    NameSaved {
        role: ActorRole,
        result: StoredName,
    },

    // Modes
    SwitchMode(Mode),
    ConfirmModeSwitch,
    CancelModeSwitch,

    // Camera
    CameraStatus {
        slot: ScanSlot,
        output: CameraOutput,
    },
    RetryCamera(ScanSlot),
    CodeDecoded {
        slot: ScanSlot,
        text: String,
    },
    ManualItemEntered(String),
    ManualFormEntered(String),

    // Single item
    ItemLookedUp {
        requested: SalId,
        reply: GatewayReply,
    },
    SingleActionSelected(ActionType),
    SingleQtyChanged(u32),
    SingleDamagedChanged(u32),
    SingleNotesChanged(String),
    ActorNameChanged {
        role: ActorRole,
        name: String,
    },
    SubmitSingle,
    SingleSubmitted {
        sal_id: SalId,
        reply: GatewayReply,
    },
    ResetSingle,

    // Batch
    AreasLoaded(GatewayReply),
    AreaSelected(Option<String>),
    BatchActionSelected(ActionType),
    AreaItemsLoaded {
        key: BatchKey,
        reply: GatewayReply,
    },
    LineChecked {
        sal_id: SalId,
        checked: bool,
    },
    LineQtyChanged {
        sal_id: SalId,
        qty: u32,
    },
    LineDamagedChanged {
        sal_id: SalId,
        damaged_qty: u32,
    },
    SelectAll(bool),
    BatchNotesChanged(String),
    SubmitBulk,
    BulkSubmitted {
        key: BatchKey,
        reply: GatewayReply,
    },

    // Signed-form upload
    FormLookedUp {
        requested: FormNumber,
        reply: GatewayReply,
    },
    CapturePhotoRequested,
    PhotoCaptured {
        form_no: FormNumber,
        output: CameraOutput,
    },
    RemovePhoto(usize),
    NotifyToggled(bool),
    SubmitSignedForm,
    SignedFormSubmitted {
        form_no: FormNumber,
        reply: GatewayReply,
    },

    DismissNotice,
    DismissConfirmation,
}

impl Event {
    /// Stable name for log fields.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppStarted => "app_started",
            Self::Configure(_) => "configure",
            Self::NameRestored { .. } => "name_restored",
            Self::NameSaved { .. } => "name_saved",
            Self::SwitchMode(_) => "switch_mode",
            Self::ConfirmModeSwitch => "confirm_mode_switch",
            Self::CancelModeSwitch => "cancel_mode_switch",
            Self::CameraStatus { .. } => "camera_status",
            Self::RetryCamera(_) => "retry_camera",
            Self::CodeDecoded { .. } => "code_decoded",
            Self::ManualItemEntered(_) => "manual_item_entered",
            Self::ManualFormEntered(_) => "manual_form_entered",
            Self::ItemLookedUp { .. } => "item_looked_up",
            Self::SingleActionSelected(_) => "single_action_selected",
            Self::SingleQtyChanged(_) => "single_qty_changed",
            Self::SingleDamagedChanged(_) => "single_damaged_changed",
            Self::SingleNotesChanged(_) => "single_notes_changed",
            Self::ActorNameChanged { .. } => "actor_name_changed",
            Self::SubmitSingle => "submit_single",
            Self::SingleSubmitted { .. } => "single_submitted",
            Self::ResetSingle => "reset_single",
            Self::AreasLoaded(_) => "areas_loaded",
            Self::AreaSelected(_) => "area_selected",
            Self::BatchActionSelected(_) => "batch_action_selected",
            Self::AreaItemsLoaded { .. } => "area_items_loaded",
            Self::LineChecked { .. } => "line_checked",
            Self::LineQtyChanged { .. } => "line_qty_changed",
            Self::LineDamagedChanged { .. } => "line_damaged_changed",
            Self::SelectAll(_) => "select_all",
            Self::BatchNotesChanged(_) => "batch_notes_changed",
            Self::SubmitBulk => "submit_bulk",
            Self::BulkSubmitted { .. } => "bulk_submitted",
            Self::FormLookedUp { .. } => "form_looked_up",
            Self::CapturePhotoRequested => "capture_photo_requested",
            Self::PhotoCaptured { .. } => "photo_captured",
            Self::RemovePhoto(_) => "remove_photo",
            Self::NotifyToggled(_) => "notify_toggled",
            Self::SubmitSignedForm => "submit_signed_form",
            Self::SignedFormSubmitted { .. } => "signed_form_submitted",
            Self::DismissNotice => "dismiss_notice",
            Self::DismissConfirmation => "dismiss_confirmation",
        }
    }
}

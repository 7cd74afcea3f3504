//! Mutating requests: single dispatch/return, bulk dispatch/return and
//! signed-form upload.
//!
//! Every builder validates locally first; a request body only exists once
//! its preconditions hold. Sending is the app's job.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::SelectionLine;
use crate::gateway::{decode_reply, GatewayError, GatewayReply};
use crate::image_processing::EncodedPhoto;
use crate::model::{ActionType, Actors, FormNumber, SalId, StockItem};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Please enter the operator name")]
    MissingOperator,
    #[error("Please enter the team member name")]
    MissingTeamMember,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Damaged quantity cannot exceed the returned quantity")]
    DamagedExceedsQuantity,
    #[error("No items selected")]
    NoItemsSelected,
    #[error("Select an area first")]
    NoAreaSelected,
    #[error("Add at least one photo of the signed form")]
    NoPhotos,
    #[error("Scan an item first")]
    NoCurrentItem,
    #[error("Scan a form first")]
    NoCurrentForm,
}

/// Logical action surfaces. Each is serialized independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Surface {
    Single,
    Bulk,
    Upload,
}

impl Surface {
    const fn bit(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Bulk => 1 << 1,
            Self::Upload => 1 << 2,
        }
    }
}

/// Mutual exclusion per surface: a second submit while one is in flight is
/// a no-op, not a queued request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitLatch {
    held: u8,
}

impl SubmitLatch {
    /// Returns false when `surface` already has a request in flight.
    pub fn try_acquire(&mut self, surface: Surface) -> bool {
        if self.is_busy(surface) {
            return false;
        }
        self.held |= surface.bit();
        true
    }

    pub fn release(&mut self, surface: Surface) {
        self.held &= !surface.bit();
    }

    #[must_use]
    pub fn is_busy(&self, surface: Surface) -> bool {
        self.held & surface.bit() != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub message: String,
    pub form_number: Option<String>,
    /// Generated PDF or stored signed image, for the shell to offer.
    pub document_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleRequest {
    pub action: ActionType,
    pub sal_id: SalId,
    pub quantity: u32,
    pub operator_name: String,
    pub team_member_name: String,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damaged_qty: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkLine {
    pub sal_id: SalId,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damaged_qty: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub action: &'static str,
    pub area: String,
    pub operator_name: String,
    pub team_member_name: String,
    pub notes: String,
    pub items: Vec<BulkLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub action: &'static str,
    pub form_no: FormNumber,
    pub images: Vec<String>,
    pub send_telegram: bool,
}

fn check_actors(actors: &Actors) -> Result<(String, String), SubmitError> {
    let operator = actors.operator_name.trim();
    if operator.is_empty() {
        return Err(SubmitError::MissingOperator);
    }
    let team_member = actors.team_member_name.trim();
    if team_member.is_empty() {
        return Err(SubmitError::MissingTeamMember);
    }
    Ok((operator.to_string(), team_member.to_string()))
}

pub struct SingleInput<'a> {
    pub item: Option<&'a StockItem>,
    pub action: ActionType,
    pub qty: u32,
    pub damaged_qty: u32,
    pub actors: &'a Actors,
    pub notes: &'a str,
}

pub fn build_single(input: &SingleInput<'_>) -> Result<SingleRequest, SubmitError> {
    let item = input.item.ok_or(SubmitError::NoCurrentItem)?;
    let (operator_name, team_member_name) = check_actors(input.actors)?;
    if input.qty < 1 {
        return Err(SubmitError::InvalidQuantity);
    }
    let damaged_qty = match input.action {
        ActionType::Dispatch => None,
        ActionType::Return if input.damaged_qty > input.qty => {
            return Err(SubmitError::DamagedExceedsQuantity)
        }
        ActionType::Return => Some(input.damaged_qty),
    };
    Ok(SingleRequest {
        action: input.action,
        sal_id: item.sal_id.clone(),
        quantity: input.qty,
        operator_name,
        team_member_name,
        notes: input.notes.trim().to_string(),
        damaged_qty,
    })
}

pub fn build_bulk<'a>(
    action: ActionType,
    area: Option<&str>,
    actors: &Actors,
    notes: &str,
    lines: impl IntoIterator<Item = &'a SelectionLine>,
) -> Result<BulkRequest, SubmitError> {
    let items: Vec<BulkLine> = lines
        .into_iter()
        .filter(|line| line.checked && line.qty > 0)
        .map(|line| BulkLine {
            sal_id: line.item.sal_id.clone(),
            quantity: line.qty,
            damaged_qty: (action == ActionType::Return).then_some(line.damaged_qty),
        })
        .collect();
    if items.is_empty() {
        return Err(SubmitError::NoItemsSelected);
    }
    let area = area.ok_or(SubmitError::NoAreaSelected)?;
    let (operator_name, team_member_name) = check_actors(actors)?;
    Ok(BulkRequest {
        action: action.bulk_action(),
        area: area.to_string(),
        operator_name,
        team_member_name,
        notes: notes.trim().to_string(),
        items,
    })
}

pub fn build_upload(
    form_no: Option<&FormNumber>,
    photos: &[EncodedPhoto],
    notify: bool,
) -> Result<UploadRequest, SubmitError> {
    let form_no = form_no.ok_or(SubmitError::NoCurrentForm)?;
    if photos.is_empty() {
        return Err(SubmitError::NoPhotos);
    }
    Ok(UploadRequest {
        action: "uploadSignedForm",
        form_no: form_no.clone(),
        images: photos.iter().map(|p| p.data_url.clone()).collect(),
        send_telegram: notify,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmationDto {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    form_number: Option<serde_json::Value>,
    #[serde(default)]
    pdf_url: Option<String>,
    #[serde(default)]
    signed_form_url: Option<String>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Decodes a submit reply. An `{error}` envelope is a remote rejection.
pub fn decode_confirmation(reply: GatewayReply) -> Result<Confirmation, GatewayError> {
    let dto = decode_reply(reply, false, |body| {
        serde_json::from_slice::<ConfirmationDto>(body)
    })?;
    let form_number = match dto.form_number {
        Some(serde_json::Value::String(s)) => non_blank(Some(s)),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    Ok(Confirmation {
        message: non_blank(dto.message).unwrap_or_else(|| "Saved".to_string()),
        form_number,
        document_url: non_blank(dto.pdf_url).or_else(|| non_blank(dto.signed_form_url)),
    })
}

impl Confirmation {
    /// Toast text: message plus the form number when one was issued.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.form_number {
            Some(form) => format!("{} | Form: {form}", self.message),
            None => self.message.clone(),
        }
    }
}

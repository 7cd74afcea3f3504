//! Read-only calls against the inventory web app.
//!
//! URL builders produce the GET requests; decoders turn the raw reply bodies
//! into model types. Replies are carried as [`GatewayReply`] so the app can be
//! driven without a transport.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::capabilities::ApiEndpoint;
use crate::model::{FormKind, FormNumber, FormRecord, SalId, StockItem};

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GatewayError {
    /// The server answered `{error}` for a lookup.
    #[error("not found: {0}")]
    NotFound(String),
    /// The server answered `{error}` for any other request.
    #[error("remote error: {0}")]
    Remote(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Message without the category prefix, as shown to the operator.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::NotFound(m) | Self::Remote(m) | Self::Network(m) | Self::Malformed(m) => m,
        }
    }
}

/// Raw body of a completed request, or the transport failure.
pub type GatewayReply = Result<Vec<u8>, GatewayError>;

pub fn reply_from_http(result: crux_http::Result<crux_http::Response<Vec<u8>>>) -> GatewayReply {
    match result {
        Ok(mut response) => {
            let status = response.status();
            let body = response.take_body().unwrap_or_default();
            if status.is_success() {
                Ok(body)
            } else if let Some(message) = error_message(&body) {
                Err(GatewayError::Remote(message))
            } else {
                Err(GatewayError::Network(format!("HTTP {status}")))
            }
        }
        Err(e) => Err(GatewayError::Network(e.to_string())),
    }
}

#[must_use]
pub fn lookup_url(endpoint: &ApiEndpoint, sal_id: &SalId) -> String {
    endpoint.query_url("lookup", &[("id", sal_id.as_str())])
}

#[must_use]
pub fn areas_url(endpoint: &ApiEndpoint) -> String {
    endpoint.query_url("areas", &[])
}

#[must_use]
pub fn area_items_url(endpoint: &ApiEndpoint, area: &str) -> String {
    endpoint.query_url("areaItems", &[("area", area)])
}

#[must_use]
pub fn form_lookup_url(endpoint: &ApiEndpoint, form_no: &FormNumber) -> String {
    endpoint.query_url("formLookup", &[("formNo", form_no.as_str())])
}

// --- Lenient field decoding ---

/// Spreadsheet cells arrive as numbers, numeric strings or blanks.
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let n = match &value {
        serde_json::Value::Null => 0.0,
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) if s.trim().is_empty() => 0.0,
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("expected a count, got {s:?}")))?,
        other => return Err(de::Error::custom(format!("expected a count, got {other}"))),
    };
    if n.is_finite() && n > 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = n.min(f64::from(u32::MAX)).floor() as u32;
        Ok(count)
    } else {
        Ok(0)
    }
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::String(s) => {
            matches!(s.trim().to_ascii_uppercase().as_str(), "Y" | "YES" | "TRUE")
        }
        _ => false,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemDto {
    sal_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    area: String,
    #[serde(default, deserialize_with = "lenient_text")]
    item: String,
    #[serde(default, deserialize_with = "lenient_text")]
    purpose: String,
    #[serde(default, deserialize_with = "lenient_count")]
    required_qty: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    total_dispatched: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    total_returned: u32,
    #[serde(default, deserialize_with = "lenient_flag")]
    return_to_sal: bool,
}

impl From<ItemDto> for StockItem {
    fn from(dto: ItemDto) -> Self {
        Self {
            sal_id: SalId::new(dto.sal_id.trim()),
            area: dto.area,
            name: dto.item,
            purpose: (!dto.purpose.is_empty()).then_some(dto.purpose),
            required_qty: dto.required_qty,
            total_dispatched: dto.total_dispatched,
            total_returned: dto.total_returned,
            return_to_source: dto.return_to_sal,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SalIds {
    Many(Vec<String>),
    One(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormDto {
    form_no: String,
    #[serde(default)]
    sal_ids: Option<SalIds>,
    #[serde(default)]
    sal_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    area: String,
    #[serde(default, deserialize_with = "lenient_count")]
    total_qty: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    damaged_qty: u32,
    #[serde(default, deserialize_with = "lenient_text")]
    operator_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    team_member_name: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    has_signed_copy: bool,
    #[serde(default)]
    signed_form_url: Option<String>,
}

impl From<FormDto> for FormRecord {
    fn from(dto: FormDto) -> Self {
        let ids = match (dto.sal_ids, dto.sal_id) {
            (Some(SalIds::Many(ids)), _) => ids,
            // Bulk forms may list ids as one comma-separated cell.
            (Some(SalIds::One(joined)), _) => joined.split(',').map(str::to_string).collect(),
            (None, Some(id)) => vec![id],
            (None, None) => Vec::new(),
        };
        let signed_form_url = dto.signed_form_url.filter(|url| !url.trim().is_empty());
        let form_no = dto.form_no.trim().to_string();
        Self {
            kind: FormKind::from_number(&form_no),
            form_no: FormNumber::new(form_no),
            sal_ids: ids
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(SalId::new)
                .collect(),
            area: dto.area,
            total_qty: dto.total_qty,
            damaged_qty: dto.damaged_qty,
            operator_name: dto.operator_name,
            team_member_name: dto.team_member_name,
            has_signed_copy: dto.has_signed_copy || signed_form_url.is_some(),
            signed_form_url,
        }
    }
}

#[derive(Deserialize)]
struct AreasDto {
    #[serde(default)]
    areas: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct AreaItemsDto {
    #[serde(default)]
    items: Vec<ItemDto>,
}

/// `{error: "..."}` envelope, if the body is one.
fn error_message(body: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: serde_json::Value,
    }

    let envelope: ErrorEnvelope = serde_json::from_slice(body).ok()?;
    match envelope.error {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Shared decode path: transport failure, `{error}` envelope, then the payload.
/// `error_as_not_found` selects how an envelope is classified.
pub(crate) fn decode_reply<T, F>(
    reply: GatewayReply,
    error_as_not_found: bool,
    parse: F,
) -> Result<T, GatewayError>
where
    F: FnOnce(&[u8]) -> Result<T, serde_json::Error>,
{
    let body = reply?;
    if let Some(message) = error_message(&body) {
        debug!(%message, "remote error envelope");
        return Err(if error_as_not_found {
            GatewayError::NotFound(message)
        } else {
            GatewayError::Remote(message)
        });
    }
    parse(&body).map_err(|e| GatewayError::Malformed(e.to_string()))
}

pub fn decode_item(reply: GatewayReply) -> Result<StockItem, GatewayError> {
    decode_reply(reply, true, |body| {
        serde_json::from_slice::<ItemDto>(body).map(StockItem::from)
    })
}

pub fn decode_form(reply: GatewayReply) -> Result<FormRecord, GatewayError> {
    decode_reply(reply, true, |body| {
        serde_json::from_slice::<FormDto>(body).map(FormRecord::from)
    })
}

/// Area names, trimmed, blanks dropped, deduplicated in first-seen order.
pub fn decode_areas(reply: GatewayReply) -> Result<Vec<String>, GatewayError> {
    let dto = decode_reply(reply, false, |body| {
        serde_json::from_slice::<AreasDto>(body)
    })?;
    let mut areas: Vec<String> = Vec::with_capacity(dto.areas.len());
    for value in dto.areas {
        let name = match value {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => continue,
        };
        if !name.is_empty() && !areas.contains(&name) {
            areas.push(name);
        }
    }
    Ok(areas)
}

pub fn decode_area_items(reply: GatewayReply) -> Result<Vec<StockItem>, GatewayError> {
    let dto = decode_reply(reply, false, |body| {
        serde_json::from_slice::<AreaItemsDto>(body)
    })?;
    Ok(dto.items.into_iter().map(StockItem::from).collect())
}

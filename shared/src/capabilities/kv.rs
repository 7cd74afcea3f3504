use thiserror::Error;

use crate::model::ActorRole;

pub const MAX_NAME_BYTES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoredNameError {
    #[error("stored name for {role:?} is not valid UTF-8")]
    NotUtf8 { role: ActorRole },
    #[error("stored name for {role:?} exceeds {max} bytes")]
    TooLong { role: ActorRole, max: usize },
}

/// Storage key for a remembered display name. Keys carry no expiry.
#[must_use]
pub const fn name_key(role: ActorRole) -> &'static str {
    match role {
        ActorRole::Operator => "sal-operator-name",
        ActorRole::TeamMember => "sal-team-member-name",
    }
}

/// Trimmed name, cut at a char boundary so it always fits `MAX_NAME_BYTES`.
#[must_use]
pub fn encode_name(name: &str) -> Vec<u8> {
    let name = name.trim();
    let mut end = name.len().min(MAX_NAME_BYTES);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].trim_end().as_bytes().to_vec()
}

/// Decodes a stored value. Blank values read as "nothing remembered".
pub fn decode_name(role: ActorRole, bytes: &[u8]) -> Result<Option<String>, StoredNameError> {
    if bytes.len() > MAX_NAME_BYTES {
        return Err(StoredNameError::TooLong {
            role,
            max: MAX_NAME_BYTES,
        });
    }
    let name = std::str::from_utf8(bytes).map_err(|_| StoredNameError::NotUtf8 { role })?;
    let name = name.trim();
    Ok((!name.is_empty()).then(|| name.to_string()))
}

pub mod groups;
pub mod health;
pub mod info;
pub mod membership;
pub mod users;

use groupbridge_types::MemberKind;

use crate::api::error::AppError;

pub(crate) fn parse_kind(kind: &str) -> Result<MemberKind, AppError> {
    MemberKind::parse(kind)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown member kind '{}'", kind)))
}

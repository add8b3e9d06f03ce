use std::str::FromStr;

use alloy_primitives::Address;
use chrono::Utc;

use crate::error::AppError;

pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;
pub const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

pub fn validate_upload(content_type: Option<&str>, size: usize) -> Result<String, AppError> {
    let content_type = content_type.unwrap_or_default();

    if !ALLOWED_TYPES.contains(&content_type) {
        return Err(AppError::InvalidFileType(content_type.to_string()));
    }

    if size > MAX_UPLOAD_SIZE {
        return Err(AppError::FileTooLarge);
    }

    Ok(content_type.to_string())
}

pub fn parse_address(raw: &str) -> Result<Address, AppError> {
    Address::from_str(raw.trim()).map_err(|_| AppError::InvalidAddress(raw.to_string()))
}

/// `meme-<millis>-<filename>`
pub fn pin_name(millis: i64, file_name: &str) -> String {
    format!("meme-{millis}-{file_name}")
}

pub fn now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

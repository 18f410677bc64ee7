//! API response types

use serde::Serialize;

/// Generic success wrapper: `{success: true, data: ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always true
    pub success: bool,
    /// Response payload
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

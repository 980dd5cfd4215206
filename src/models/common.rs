use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Normalized error envelope returned by the game service for every non-2xx response
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

/// One page of a paginated list endpoint
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    /// Offset of the next page, if the server reports more items
    pub fn next_offset(&self) -> Option<u64> {
        let next = self.offset + self.items.len() as u64;
        if self.items.is_empty() || next >= self.total {
            None
        } else {
            Some(next)
        }
    }
}

/// Pagination query parameters
#[derive(Debug, Serialize, Clone, Copy)]
pub struct PageQuery {
    pub offset: u64,
    pub limit: u64,
}

impl PageQuery {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit: limit.clamp(1, 1000) }
    }
}

use serde_json::Value;

/// One element of the source `data` array, as decoded from the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    /// Zero-based index of the element within the array.
    pub position: u64,
    pub value: Value,
}

impl RawItem {
    pub fn new(position: u64, value: Value) -> Self {
        Self { position, value }
    }
}

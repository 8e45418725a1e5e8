use serde::{Serialize, Deserialize};

/// Opaque payload of one data frame received from the feed.
///
/// Content is never inspected. Text frames keep their string
/// form, binary frames their raw bytes.
///
/// Control frames (ping / pong / close) are handled by the
/// transport and never reach a batch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

// ------------------------------------------------------------
// Timed record
// ------------------------------------------------------------
//
// One received frame plus the moment it arrived.
//
// `at` is wall-clock time, `elapsed_ns` is measured on the
// monotonic clock from the start of the run. Only the latter
// drives the budget check.
//
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TimedRecord {
    /// Frame payload, stored verbatim
    pub msg: Frame,

    /// Receipt time in nanoseconds since Unix epoch
    pub at: i64,

    /// Receipt time in nanoseconds since the run started
    pub elapsed_ns: u64,
}

// ------------------------------------------------------------
// Batch
// ------------------------------------------------------------
//
// Everything one run collected. Posted exactly once, after the
// budget is reached. A run that ends any other way posts nothing.
//
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Worker that produced this batch
    pub worker: usize,

    /// Run start in nanoseconds since Unix epoch
    pub started_at: i64,

    /// Flush time in nanoseconds since Unix epoch
    pub finished_at: i64,

    /// Records in arrival order
    pub records: Vec<TimedRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_serialize_with_type_tag() {
        let text = serde_json::to_value(Frame::Text("{\"u\":1}".into())).unwrap();
        assert_eq!(text, serde_json::json!({ "type": "text", "data": "{\"u\":1}" }));

        let bin = serde_json::to_value(Frame::Binary(vec![1, 2])).unwrap();
        assert_eq!(bin, serde_json::json!({ "type": "binary", "data": [1, 2] }));
    }
}

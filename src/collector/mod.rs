/// Collector module
///
/// This module groups the logic responsible for:
/// - Running one timed collection over a single feed connection
/// - Fanning out N independent collectors against one sink
///
/// The collector layer sits between:
/// - The endpoint (connection setup, TLS options)
/// - The batch sink (output / consumer side)
///
/// Design notes:
/// - Frame contents are never parsed here
/// - Workers share nothing but the sink and the metrics counters
pub mod runner;

use serde::{Deserialize, Serialize};

use crate::util::{Result, Slice};

/// Default batch watermark in bytes, the high water mark of a readable
/// stream.
pub const DEFAULT_HIGH_WATER_MARK: usize = 16 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DBOptions {
    /// Threads in the pool that runs asynchronous advances and ends.
    pub worker_threads: usize,
}

impl Default for DBOptions {
    fn default() -> Self {
        DBOptions { worker_threads: 4 }
    }
}

impl DBOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Options for a store iterator handle.
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Hint to the engine that blocks read by this iterator should be
    /// cached.
    pub fill_cache: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions { fill_cache: true }
    }
}

/// Caller-facing options of a range iterator.
///
/// Field names deserialize in camelCase (`keyAsBuffer`, `highWaterMark`...)
/// and boundary values accept either a string or an array of bytes:
///
/// ```ignore
/// let opts = RangeOptions::from_json(r#"{"gte": "user:", "lt": "user;", "limit": 10}"#)?;
/// ```
///
/// Zero-length boundaries are treated as absent.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RangeOptions {
    pub start: Option<Slice>,
    pub end: Option<Slice>,
    pub lt: Option<Slice>,
    pub lte: Option<Slice>,
    pub gt: Option<Slice>,
    pub gte: Option<Slice>,
    pub reverse: bool,
    /// Materialize keys in returned entries.
    pub keys: bool,
    /// Materialize values in returned entries.
    pub values: bool,
    pub key_as_buffer: bool,
    pub value_as_buffer: bool,
    pub fill_cache: bool,
    /// Maximum number of entries over the iterator's lifetime; negative
    /// means unbounded.
    pub limit: i64,
    /// Byte watermark at which a batch is cut.
    pub high_water_mark: usize,
}

impl Default for RangeOptions {
    fn default() -> Self {
        RangeOptions {
            start: None,
            end: None,
            lt: None,
            lte: None,
            gt: None,
            gte: None,
            reverse: false,
            keys: true,
            values: true,
            key_as_buffer: true,
            value_as_buffer: true,
            fill_cache: false,
            limit: -1,
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
        }
    }
}

impl RangeOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_options_defaults() {
        let opts = RangeOptions::default();
        assert!(!opts.reverse);
        assert!(opts.keys && opts.values);
        assert!(opts.key_as_buffer && opts.value_as_buffer);
        assert!(!opts.fill_cache);
        assert_eq!(opts.limit, -1);
        assert_eq!(opts.high_water_mark, 16384);
    }

    #[test]
    fn test_range_options_from_json() {
        let opts = RangeOptions::from_json(
            r#"{"gt": "b", "lt": [101], "reverse": true, "keyAsBuffer": false, "highWaterMark": 10}"#,
        )
        .unwrap();

        assert_eq!(opts.gt, Some(Slice::from("b")));
        assert_eq!(opts.lt, Some(Slice::from("e")));
        assert!(opts.reverse);
        assert!(!opts.key_as_buffer);
        assert!(opts.value_as_buffer);
        assert_eq!(opts.high_water_mark, 10);
        assert_eq!(opts.limit, -1);
    }

    #[test]
    fn test_range_options_bad_json() {
        let err = RangeOptions::from_json(r#"{"limit": "ten"}"#).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_db_options_from_json() {
        let opts = DBOptions::from_json(r#"{"worker_threads": 2}"#).unwrap();
        assert_eq!(opts.worker_threads, 2);
        assert_eq!(DBOptions::from_json("{}").unwrap().worker_threads, 4);
    }
}

//! Ad-hoc index functions.
//!
//! The store has no secondary indexes of its own. An [`IndexFunction`] is
//! evaluated against every candidate document at query time; documents for
//! which it emits a key that satisfies the [`IndexQuery`] are returned.
//! Emitted keys are ordered with [`collate_keys`].

use std::cmp::Ordering;

use doclink_types::{Document, KeyRange};
use serde_json::{Number, Value};

/// A composite key emitted by an index function.
pub type IndexKey = Vec<Value>;

/// A per-query function mapping a document to at most one index key.
pub trait IndexFunction: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// The key to index `document` under, or `None` to leave it out.
    fn emit(&self, document: &Document) -> Option<IndexKey>;
}

/// Which emitted keys a query accepts.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexMatch {
    /// Keys collating equal to this one.
    Exact(IndexKey),
    /// Keys in `[start, end)` under collation order.
    Range { start: IndexKey, end: IndexKey },
}

/// An index query, optionally bounded to a primary-key range.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexQuery {
    pub matching: IndexMatch,
    /// Only documents whose storage key lies in this range are considered.
    pub within: Option<KeyRange>,
}

impl IndexQuery {
    pub fn exact(key: IndexKey) -> Self {
        Self {
            matching: IndexMatch::Exact(key),
            within: None,
        }
    }

    pub fn range(start: IndexKey, end: IndexKey) -> Self {
        Self {
            matching: IndexMatch::Range { start, end },
            within: None,
        }
    }

    pub fn within(mut self, range: KeyRange) -> Self {
        self.within = Some(range);
        self
    }

    /// Returns `true` if a document stored under `key` that emitted
    /// `emitted` satisfies the query.
    pub fn accepts(&self, key: &str, emitted: &[Value]) -> bool {
        if let Some(range) = &self.within {
            if !range.contains(key) {
                return false;
            }
        }
        match &self.matching {
            IndexMatch::Exact(expected) => collate_keys(emitted, expected) == Ordering::Equal,
            IndexMatch::Range { start, end } => {
                collate_keys(emitted, start) != Ordering::Less
                    && collate_keys(emitted, end) == Ordering::Less
            }
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Total order over JSON values:
/// `null < false < true < numbers < strings < arrays < objects`.
///
/// Numbers compare numerically (`1` equals `1.0`), strings by code point,
/// arrays element-wise, objects entry-wise by key then value.
pub fn collate(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => collate_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => collate_keys(x, y),
        (Value::Object(x), Value::Object(y)) => {
            for ((xk, xv), (yk, yv)) in x.iter().zip(y.iter()) {
                let ord = xk.cmp(yk).then_with(|| collate(xv, yv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => Ordering::Equal,
    }
}

/// Integers compare exactly; only a float on either side falls back to `f64`.
fn collate_numbers(x: &Number, y: &Number) -> Ordering {
    match (as_integer(x), as_integer(y)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Lexicographic [`collate`] over composite keys; a strict prefix sorts first.
pub fn collate_keys(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = collate(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

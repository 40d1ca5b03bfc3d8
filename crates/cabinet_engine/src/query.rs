//! Queries over a [`TableDb`].
//!
//! A query accumulates conditions, an optional order and an optional limit.
//! Conditions are combined with logical AND. Like the cursor, a query only
//! holds its own state and is handed the table on every search.

use crate::error::ErrorCode;
use crate::table::{IndexKind, TableDb};
use crate::types::{parse_float_prefix, NativeList, NativeMap};
use regex::bytes::Regex;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Comparator codes accepted by [`TableQuery::addcond`].
pub mod op {
    /// String equals.
    pub const STREQ: i64 = 0;
    /// String includes.
    pub const STRINC: i64 = 1;
    /// String begins with.
    pub const STRBW: i64 = 2;
    /// String ends with.
    pub const STREW: i64 = 3;
    /// String includes all tokens.
    pub const STRAND: i64 = 4;
    /// String includes at least one token.
    pub const STROR: i64 = 5;
    /// String equals at least one token.
    pub const STROREQ: i64 = 6;
    /// String matches a regular expression.
    pub const STRRX: i64 = 7;
    /// Number equals.
    pub const NUMEQ: i64 = 8;
    /// Number is greater than.
    pub const NUMGT: i64 = 9;
    /// Number is greater than or equal to.
    pub const NUMGE: i64 = 10;
    /// Number is less than.
    pub const NUMLT: i64 = 11;
    /// Number is less than or equal to.
    pub const NUMLE: i64 = 12;
    /// Number is between two tokens.
    pub const NUMBT: i64 = 13;
    /// Number equals at least one token.
    pub const NUMOREQ: i64 = 14;
    /// Full-text phrase search.
    pub const FTSPH: i64 = 15;
    /// Full-text search, all tokens.
    pub const FTSAND: i64 = 16;
    /// Full-text search, any token.
    pub const FTSOR: i64 = 17;
    /// Full-text compound expression.
    pub const FTSEX: i64 = 18;
    /// Flag: negate the condition.
    pub const NEGATE: i64 = 1 << 24;
    /// Flag: do not use an index.
    pub const NOIDX: i64 = 1 << 25;
}

/// Order type codes accepted by [`TableQuery::setorder`].
pub mod order {
    /// String ascending.
    pub const STRASC: i64 = 0;
    /// String descending.
    pub const STRDESC: i64 = 1;
    /// Number ascending.
    pub const NUMASC: i64 = 2;
    /// Number descending.
    pub const NUMDESC: i64 = 3;
}

const OP_NAMES: [&str; 19] = [
    "STREQ", "STRINC", "STRBW", "STREW", "STRAND", "STROR", "STROREQ", "STRRX", "NUMEQ", "NUMGT",
    "NUMGE", "NUMLT", "NUMLE", "NUMBT", "NUMOREQ", "FTSPH", "FTSAND", "FTSOR", "FTSEX",
];

/// How [`TableQuery::metasearch`] combines result sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetOp {
    /// Keys in any set.
    #[default]
    Union,
    /// Keys in every set.
    Intersect,
    /// Keys in the first set and no other.
    Difference,
}

impl SetOp {
    /// Decodes an `MS*` constant.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SetOp::Union),
            1 => Some(SetOp::Intersect),
            2 => Some(SetOp::Difference),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Condition {
    column: Vec<u8>,
    op: i64,
    negate: bool,
    noidx: bool,
    expr: Vec<u8>,
    regex: Option<Regex>,
}

impl Condition {
    fn matches(&self, pkey: &[u8], row: &NativeMap) -> bool {
        let value = if self.column.is_empty() {
            Some(pkey)
        } else {
            row.get(&self.column).map(Vec::as_slice)
        };
        let hit = value.is_some_and(|v| self.test(v));
        hit != self.negate
    }

    fn test(&self, value: &[u8]) -> bool {
        let expr = self.expr.as_slice();
        match self.op {
            op::STREQ => value == expr,
            op::STRINC => contains(value, expr),
            op::STRBW => value.starts_with(expr),
            op::STREW => value.ends_with(expr),
            op::STRAND => {
                let words = tokens(value);
                tokens(expr).iter().all(|t| words.contains(t))
            }
            op::STROR => {
                let words = tokens(value);
                tokens(expr).iter().any(|t| words.contains(t))
            }
            op::STROREQ => tokens(expr).iter().any(|t| *t == value),
            op::STRRX => self.regex.as_ref().is_some_and(|rx| rx.is_match(value)),
            op::NUMEQ => parse_float_prefix(value) == parse_float_prefix(expr),
            op::NUMGT => parse_float_prefix(value) > parse_float_prefix(expr),
            op::NUMGE => parse_float_prefix(value) >= parse_float_prefix(expr),
            op::NUMLT => parse_float_prefix(value) < parse_float_prefix(expr),
            op::NUMLE => parse_float_prefix(value) <= parse_float_prefix(expr),
            op::NUMBT => {
                let bounds = tokens(expr);
                let (Some(lo), Some(hi)) = (bounds.first(), bounds.get(1)) else {
                    return false;
                };
                let (lo, hi) = (parse_float_prefix(lo), parse_float_prefix(hi));
                let (lo, hi) = if lo > hi { (hi, lo) } else { (lo, hi) };
                let num = parse_float_prefix(value);
                num >= lo && num <= hi
            }
            op::NUMOREQ => {
                let num = parse_float_prefix(value);
                tokens(expr).iter().any(|t| parse_float_prefix(t) == num)
            }
            op::FTSPH => fold(value).contains(&fold(expr)),
            op::FTSAND => {
                let text = fold(value);
                let words: Vec<String> = fold(expr).split_whitespace().map(String::from).collect();
                !words.is_empty() && words.iter().all(|w| text.contains(w.as_str()))
            }
            op::FTSOR => {
                let text = fold(value);
                fold(expr).split_whitespace().any(|w| text.contains(w))
            }
            op::FTSEX => fts_compound(&fold(value), &fold(expr)),
            _ => false,
        }
    }
}

/// Splits on spaces and commas, dropping empty pieces.
fn tokens(bytes: &[u8]) -> Vec<&[u8]> {
    bytes
        .split(|b| *b == b' ' || *b == b',')
        .filter(|t| !t.is_empty())
        .collect()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

fn fold(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_lowercase()
}

/// Evaluates a compound full-text expression.
///
/// Clauses separated by `||` are alternatives; inside a clause every word
/// or double-quoted phrase must appear. `&&` is accepted as an explicit
/// conjunction.
fn fts_compound(text: &str, expr: &str) -> bool {
    expr.split("||").any(|clause| {
        let mut terms = Vec::new();
        let mut rest = clause.trim();
        while !rest.is_empty() {
            if let Some(quoted) = rest.strip_prefix('"') {
                let end = quoted.find('"').unwrap_or(quoted.len());
                terms.push(quoted[..end].trim().to_string());
                rest = quoted.get(end + 1..).unwrap_or("").trim_start();
            } else {
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                terms.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
        }
        terms.retain(|t| !t.is_empty() && t != "&&");
        !terms.is_empty() && terms.iter().all(|t| text.contains(t.as_str()))
    })
}

fn index_serves(kind: IndexKind, op: i64) -> bool {
    match kind {
        IndexKind::Lexical => (op::STREQ..=op::STRRX).contains(&op),
        IndexKind::Decimal => (op::NUMEQ..=op::NUMOREQ).contains(&op),
        IndexKind::Token => matches!(op, op::STRAND | op::STROR),
        IndexKind::QGram => (op::FTSPH..=op::FTSEX).contains(&op),
    }
}

/// A query against a [`TableDb`].
#[derive(Debug, Clone, Default)]
pub struct TableQuery {
    conds: Vec<Condition>,
    order: Option<(Vec<u8>, i64)>,
    max: i64,
    skip: i64,
    hint: String,
}

impl TableQuery {
    /// Creates an empty query: every row, natural order, no limit.
    pub fn new() -> Self {
        Self {
            max: -1,
            ..Self::default()
        }
    }

    /// Adds a condition. `op` is an [`op`] code optionally or'ed with
    /// [`op::NEGATE`] and [`op::NOIDX`].
    pub fn addcond(&mut self, column: &[u8], op: i64, expr: &[u8]) {
        let negate = op & op::NEGATE != 0;
        let noidx = op & op::NOIDX != 0;
        let op = op & !(op::NEGATE | op::NOIDX);
        let regex = if op == op::STRRX {
            std::str::from_utf8(expr).ok().and_then(|p| Regex::new(p).ok())
        } else {
            None
        };
        self.conds.push(Condition {
            column: column.to_vec(),
            op,
            negate,
            noidx,
            expr: expr.to_vec(),
            regex,
        });
    }

    /// Sets the result order. A later call replaces an earlier one.
    pub fn setorder(&mut self, column: &[u8], order_type: i64) {
        self.order = Some((column.to_vec(), order_type));
    }

    /// Limits the result to `max` rows after skipping `skip`. Negative
    /// values mean unlimited and no skip.
    pub fn setlimit(&mut self, max: i64, skip: i64) {
        self.max = max;
        self.skip = skip;
    }

    /// Primary keys of the rows matching every condition, ordered and
    /// limited.
    pub fn search(&mut self, db: &mut TableDb) -> NativeList {
        let hits = self.matching(db);
        self.arrange(db, hits)
    }

    /// Removes every row [`search`](Self::search) would return.
    ///
    /// Returns false if any removal fails.
    pub fn searchout(&mut self, db: &mut TableDb) -> bool {
        if !db.core.writable() {
            return false;
        }
        let hits = self.search(db);
        let mut ok = true;
        for pkey in hits {
            if db.core.data.rows.remove(&pkey).is_none() {
                ok = db.core.fail(ErrorCode::NoRecord);
            }
        }
        ok
    }

    /// Primary keys matching the conditions, in natural order, ignoring
    /// order and limit.
    pub fn matching(&mut self, db: &mut TableDb) -> NativeList {
        self.hint.clear();
        if !db.core.readable() {
            return NativeList::new();
        }

        let indexed = self.conds.iter().find_map(|cond| {
            if cond.noidx || cond.negate || cond.column.is_empty() {
                return None;
            }
            db.index(&cond.column)
                .filter(|kind| index_serves(*kind, cond.op))
                .map(|_| cond)
        });
        match indexed {
            Some(cond) => {
                let name = OP_NAMES
                    .get(cond.op as usize)
                    .copied()
                    .unwrap_or("UNKNOWN");
                self.hint.push_str(&format!(
                    "using an index: \"{}\" asc ({name})\n",
                    String::from_utf8_lossy(&cond.column)
                ));
            }
            None => self.hint.push_str("scanning the whole table\n"),
        }

        let hits: NativeList = db
            .rows()
            .iter()
            .filter(|(pkey, row)| self.conds.iter().all(|c| c.matches(pkey, row)))
            .map(|(pkey, _)| pkey.clone())
            .collect();
        self.hint
            .push_str(&format!("result set size: {}\n", hits.len()));
        hits
    }

    /// Combines this query's matches with `others` under `set_op`, self
    /// first and the others left to right, then applies this query's order
    /// and limit.
    pub fn metasearch(&mut self, db: &mut TableDb, others: &[NativeList], set_op: SetOp) -> NativeList {
        let mine = self.matching(db);
        let combined = match set_op {
            SetOp::Union => {
                let mut seen: HashSet<Vec<u8>> = HashSet::new();
                let mut out = NativeList::new();
                for key in mine.into_iter().chain(others.iter().flatten().cloned()) {
                    if seen.insert(key.clone()) {
                        out.push(key);
                    }
                }
                out
            }
            SetOp::Intersect => {
                let sets: Vec<HashSet<&Vec<u8>>> =
                    others.iter().map(|o| o.iter().collect()).collect();
                mine.into_iter()
                    .filter(|k| sets.iter().all(|s| s.contains(k)))
                    .collect()
            }
            SetOp::Difference => {
                let excluded: HashSet<&Vec<u8>> = others.iter().flatten().collect();
                mine.into_iter().filter(|k| !excluded.contains(k)).collect()
            }
        };
        self.hint.push_str(&format!(
            "meta search: {} other queries, combined size: {}\n",
            others.len(),
            combined.len()
        ));
        self.arrange(db, combined)
    }

    /// Planner explanation of the last search.
    pub fn hint(&self) -> &str {
        &self.hint
    }

    fn arrange(&mut self, db: &TableDb, mut keys: NativeList) -> NativeList {
        match &self.order {
            Some((column, order_type)) => {
                let rows = db.rows();
                let cell = |pkey: &Vec<u8>| -> Vec<u8> {
                    if column.is_empty() {
                        pkey.clone()
                    } else {
                        rows.get(pkey)
                            .and_then(|row| row.get(column))
                            .cloned()
                            .unwrap_or_default()
                    }
                };
                let numeric = |pkey: &Vec<u8>| parse_float_prefix(&cell(pkey));
                match *order_type {
                    order::STRDESC => keys.sort_by(|a, b| cell(b).cmp(&cell(a))),
                    order::NUMASC => keys.sort_by(|a, b| {
                        numeric(a).partial_cmp(&numeric(b)).unwrap_or(Ordering::Equal)
                    }),
                    order::NUMDESC => keys.sort_by(|a, b| {
                        numeric(b).partial_cmp(&numeric(a)).unwrap_or(Ordering::Equal)
                    }),
                    _ => keys.sort_by_key(|k| cell(k)),
                }
                self.hint.push_str(&format!(
                    "sorting the result set: \"{}\"\n",
                    String::from_utf8_lossy(column)
                ));
            }
            None => self.hint.push_str("leaving the natural order\n"),
        }

        let skip = usize::try_from(self.skip).unwrap_or(0);
        let iter = keys.into_iter().skip(skip);
        match usize::try_from(self.max) {
            Ok(max) => iter.take(max).collect(),
            Err(_) => iter.collect(),
        }
    }
}

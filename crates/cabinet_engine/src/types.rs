//! Core types shared by every backend.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;

/// Ordered list of byte strings.
///
/// Used for multi-key results: prefix scans, ranges, duplicate-value lists
/// and query hit sets.
pub type NativeList = Vec<Vec<u8>>;

/// Key-sorted map from column name to value, used for table rows.
pub type NativeMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// The handle kinds a binding can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Hash database.
    KeyedStore,
    /// B+tree database.
    OrderedStore,
    /// Fixed-length database.
    FixedStore,
    /// Table database.
    TabularStore,
    /// Abstract database dispatching to one of the others.
    AbstractStore,
    /// Cursor over an ordered store.
    OrderedCursor,
    /// Query over a tabular store.
    TabularQuery,
}

impl BackendKind {
    /// Every kind, in declaration order.
    pub const ALL: [BackendKind; 7] = [
        BackendKind::KeyedStore,
        BackendKind::OrderedStore,
        BackendKind::FixedStore,
        BackendKind::TabularStore,
        BackendKind::AbstractStore,
        BackendKind::OrderedCursor,
        BackendKind::TabularQuery,
    ];

    /// Host-visible constructor name.
    pub const fn class_name(self) -> &'static str {
        match self {
            BackendKind::KeyedStore => "KeyedStore",
            BackendKind::OrderedStore => "OrderedStore",
            BackendKind::FixedStore => "FixedStore",
            BackendKind::TabularStore => "TabularStore",
            BackendKind::AbstractStore => "AbstractStore",
            BackendKind::OrderedCursor => "OrderedCursor",
            BackendKind::TabularQuery => "TabularQuery",
        }
    }

    /// Looks up a kind by its constructor name.
    pub fn from_class_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.class_name() == name)
    }

    /// Byte stored in snapshot headers.
    pub(crate) const fn tag(self) -> u8 {
        match self {
            BackendKind::KeyedStore => 1,
            BackendKind::OrderedStore => 2,
            BackendKind::FixedStore => 3,
            BackendKind::TabularStore => 4,
            BackendKind::AbstractStore => 5,
            BackendKind::OrderedCursor => 6,
            BackendKind::TabularQuery => 7,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// Open mode bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpenMode(u32);

impl OpenMode {
    /// Open as a reader.
    pub const READER: OpenMode = OpenMode(1);
    /// Open as a writer.
    pub const WRITER: OpenMode = OpenMode(1 << 1);
    /// Create the file if missing.
    pub const CREATE: OpenMode = OpenMode(1 << 2);
    /// Truncate an existing file.
    pub const TRUNCATE: OpenMode = OpenMode(1 << 3);
    /// Open without locking.
    pub const NO_LOCK: OpenMode = OpenMode(1 << 4);
    /// Fail instead of waiting when the lock is held elsewhere.
    pub const LOCK_NON_BLOCKING: OpenMode = OpenMode(1 << 5);
    /// Fsync on every transaction commit.
    pub const SYNC_ON_TRANSACTION: OpenMode = OpenMode(1 << 6);

    const MASK: u32 = 0x7f;

    /// Builds a mode from raw bits, ignoring unknown ones.
    pub const fn from_bits(bits: i64) -> Self {
        OpenMode(bits as u32 & Self::MASK)
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    pub const fn contains(self, other: OpenMode) -> bool {
        self.0 & other.0 == other.0
    }

    /// Writer handles may mutate; everything else is read-only.
    pub const fn is_writer(self) -> bool {
        self.contains(Self::WRITER)
    }
}

impl BitOr for OpenMode {
    type Output = OpenMode;

    fn bitor(self, rhs: OpenMode) -> OpenMode {
        OpenMode(self.0 | rhs.0)
    }
}

impl fmt::Debug for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(OpenMode, &str); 7] = [
            (OpenMode::READER, "READER"),
            (OpenMode::WRITER, "WRITER"),
            (OpenMode::CREATE, "CREATE"),
            (OpenMode::TRUNCATE, "TRUNCATE"),
            (OpenMode::NO_LOCK, "NO_LOCK"),
            (OpenMode::LOCK_NON_BLOCKING, "LOCK_NON_BLOCKING"),
            (OpenMode::SYNC_ON_TRANSACTION, "SYNC_ON_TRANSACTION"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "OpenMode({})", set.join(" | "))
    }
}

/// Tuning option flags.
///
/// Compression flags are accepted and reported back but records are never
/// compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TuningFlags(u8);

impl TuningFlags {
    /// Allow files larger than 2GB.
    pub const LARGE: TuningFlags = TuningFlags(1);
    /// Deflate records.
    pub const DEFLATE: TuningFlags = TuningFlags(1 << 1);
    /// Bzip2 records.
    pub const BZIP: TuningFlags = TuningFlags(1 << 2);
    /// Custom codec records.
    pub const TCBS: TuningFlags = TuningFlags(1 << 3);

    /// Builds flags from raw bits, ignoring unknown ones.
    pub const fn from_bits(bits: i64) -> Self {
        TuningFlags(bits as u8 & 0x0f)
    }

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    pub const fn contains(self, other: TuningFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Resolves a tuning argument where any negative value selects the default.
pub(crate) fn tuned(value: i64, default: i64) -> i64 {
    if value < 0 {
        default
    } else {
        value
    }
}

/// Parses the leading decimal integer of `bytes` the way `atoi` does.
///
/// Leading whitespace and a sign are accepted; anything unparsable is 0.
pub(crate) fn parse_int_prefix(bytes: &[u8]) -> i64 {
    let mut iter = bytes.iter().skip_while(|b| b.is_ascii_whitespace()).peekable();
    let negative = match iter.peek() {
        Some(b'-') => {
            iter.next();
            true
        }
        Some(b'+') => {
            iter.next();
            false
        }
        _ => false,
    };
    let mut value: i64 = 0;
    for b in iter {
        if !b.is_ascii_digit() {
            break;
        }
        value = value.wrapping_mul(10).wrapping_add(i64::from(b - b'0'));
    }
    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

/// Parses the leading decimal number of `bytes`, tolerating trailing junk.
///
/// Returns 0.0 when no number is present.
pub(crate) fn parse_float_prefix(bytes: &[u8]) -> f64 {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let chars: Vec<char> = text.chars().collect();
    while end < chars.len() {
        let c = chars[end];
        match c {
            '+' | '-' if end == 0 => {}
            '+' | '-' if seen_exp && matches!(chars[end - 1], 'e' | 'E') => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot && !seen_exp => seen_dot = true,
            'e' | 'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
        end += 1;
    }
    // Back off an incomplete exponent such as "1e" or "1e-".
    while end > 0 && matches!(chars[end - 1], 'e' | 'E' | '+' | '-') {
        end -= 1;
    }
    let prefix: String = chars[..end].iter().collect();
    prefix.parse().unwrap_or(0.0)
}

/// Formats a number the way the engine stores numeric columns.
pub(crate) fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_mode_bits() {
        let mode = OpenMode::WRITER | OpenMode::CREATE;
        assert_eq!(mode.bits(), 6);
        assert!(mode.is_writer());
        assert!(mode.contains(OpenMode::CREATE));
        assert!(!mode.contains(OpenMode::TRUNCATE));
        assert!(!OpenMode::READER.is_writer());
        assert_eq!(OpenMode::from_bits(0x1ff).bits(), 0x7f);
    }

    #[test]
    fn open_mode_debug_lists_flags() {
        let mode = OpenMode::READER | OpenMode::NO_LOCK;
        assert_eq!(format!("{mode:?}"), "OpenMode(READER | NO_LOCK)");
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in BackendKind::ALL {
            assert_eq!(BackendKind::from_class_name(kind.class_name()), Some(kind));
        }
        assert_eq!(BackendKind::from_class_name("HDB"), None);
    }

    #[test]
    fn negative_tuning_means_default() {
        assert_eq!(tuned(-1, 42), 42);
        assert_eq!(tuned(0, 42), 0);
        assert_eq!(tuned(7, 42), 7);
    }

    #[test]
    fn int_prefix_parsing() {
        assert_eq!(parse_int_prefix(b"18"), 18);
        assert_eq!(parse_int_prefix(b"  -42abc"), -42);
        assert_eq!(parse_int_prefix(b"abc"), 0);
        assert_eq!(parse_int_prefix(b""), 0);
    }

    #[test]
    fn float_prefix_parsing() {
        assert_eq!(parse_float_prefix(b"1.5"), 1.5);
        assert_eq!(parse_float_prefix(b"2e3x"), 2000.0);
        assert_eq!(parse_float_prefix(b"7e"), 7.0);
        assert_eq!(parse_float_prefix(b"-0.25 kg"), -0.25);
        assert_eq!(parse_float_prefix(b"n/a"), 0.0);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(15.0), "15");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
    }
}

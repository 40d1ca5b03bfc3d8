//! Named integer constants attached to each class.

use cabinet_engine::{index_type, op, order, BackendKind, ErrorCode, OpenMode, TuningFlags};

/// A named constant.
pub type Constant = (&'static str, i64);

const fn ecode(code: ErrorCode) -> Constant {
    (code.name(), code.code() as i64)
}

/// The shared error code table, present on every class.
pub const ERROR_CODES: [Constant; 24] = {
    let mut table = [("", 0); 24];
    let mut i = 0;
    while i < ErrorCode::ALL.len() {
        table[i] = ecode(ErrorCode::ALL[i]);
        i += 1;
    }
    table
};

/// Open mode flags.
pub const OPEN_MODES: [Constant; 7] = [
    ("OREADER", OpenMode::READER.bits() as i64),
    ("OWRITER", OpenMode::WRITER.bits() as i64),
    ("OCREAT", OpenMode::CREATE.bits() as i64),
    ("OTRUNC", OpenMode::TRUNCATE.bits() as i64),
    ("ONOLCK", OpenMode::NO_LOCK.bits() as i64),
    ("OLCKNB", OpenMode::LOCK_NON_BLOCKING.bits() as i64),
    ("OTSYNC", OpenMode::SYNC_ON_TRANSACTION.bits() as i64),
];

/// Tuning option flags.
pub const TUNING_FLAGS: [Constant; 4] = [
    ("TLARGE", TuningFlags::LARGE.bits() as i64),
    ("TDEFLATE", TuningFlags::DEFLATE.bits() as i64),
    ("TBZIP", TuningFlags::BZIP.bits() as i64),
    ("TTCBS", TuningFlags::TCBS.bits() as i64),
];

/// Table index types.
pub const INDEX_TYPES: [Constant; 7] = [
    ("ITLEXICAL", index_type::LEXICAL),
    ("ITDECIMAL", index_type::DECIMAL),
    ("ITTOKEN", index_type::TOKEN),
    ("ITQGRAM", index_type::QGRAM),
    ("ITOPT", index_type::OPT),
    ("ITVOID", index_type::VOID),
    ("ITKEEP", index_type::KEEP),
];

/// Cursor placements.
pub const PLACEMENTS: [Constant; 3] = [("CPCURRENT", 0), ("CPBEFORE", 1), ("CPAFTER", 2)];

/// Query comparators, flags, orders and set operations.
pub const QUERY: [Constant; 28] = [
    ("QCSTREQ", op::STREQ),
    ("QCSTRINC", op::STRINC),
    ("QCSTRBW", op::STRBW),
    ("QCSTREW", op::STREW),
    ("QCSTRAND", op::STRAND),
    ("QCSTROR", op::STROR),
    ("QCSTROREQ", op::STROREQ),
    ("QCSTRRX", op::STRRX),
    ("QCNUMEQ", op::NUMEQ),
    ("QCNUMGT", op::NUMGT),
    ("QCNUMGE", op::NUMGE),
    ("QCNUMLT", op::NUMLT),
    ("QCNUMLE", op::NUMLE),
    ("QCNUMBT", op::NUMBT),
    ("QCNUMOREQ", op::NUMOREQ),
    ("QCFTSPH", op::FTSPH),
    ("QCFTSAND", op::FTSAND),
    ("QCFTSOR", op::FTSOR),
    ("QCFTSEX", op::FTSEX),
    ("QCNEGATE", op::NEGATE),
    ("QCNOIDX", op::NOIDX),
    ("QOSTRASC", order::STRASC),
    ("QOSTRDESC", order::STRDESC),
    ("QONUMASC", order::NUMASC),
    ("QONUMDESC", order::NUMDESC),
    ("MSUNION", 0),
    ("MSISECT", 1),
    ("MSDIFF", 2),
];

/// Constant groups a class carries besides the error codes.
fn groups(kind: BackendKind) -> &'static [&'static [Constant]] {
    match kind {
        BackendKind::KeyedStore | BackendKind::OrderedStore => &[&TUNING_FLAGS, &OPEN_MODES],
        BackendKind::TabularStore => &[&TUNING_FLAGS, &OPEN_MODES, &INDEX_TYPES],
        BackendKind::FixedStore => &[&OPEN_MODES],
        BackendKind::OrderedCursor => &[&PLACEMENTS],
        BackendKind::TabularQuery => &[&QUERY],
        BackendKind::AbstractStore => &[],
    }
}

/// Every constant of a class.
pub fn class_constants(kind: BackendKind) -> impl Iterator<Item = Constant> {
    ERROR_CODES
        .into_iter()
        .chain(groups(kind).iter().flat_map(|group| group.iter().copied()))
}

/// Looks up one constant of a class.
pub fn lookup(kind: BackendKind, name: &str) -> Option<i64> {
    class_constants(kind).find(|(n, _)| *n == name).map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_has_error_codes() {
        for kind in BackendKind::ALL {
            assert_eq!(lookup(kind, "ESUCCESS"), Some(0));
            assert_eq!(lookup(kind, "ENOREC"), Some(22));
            assert_eq!(lookup(kind, "EMISC"), Some(9999));
        }
    }

    #[test]
    fn per_class_groups() {
        assert_eq!(lookup(BackendKind::KeyedStore, "TLARGE"), Some(1));
        assert_eq!(lookup(BackendKind::KeyedStore, "OTSYNC"), Some(64));
        assert_eq!(lookup(BackendKind::FixedStore, "OCREAT"), Some(4));
        assert_eq!(lookup(BackendKind::FixedStore, "TLARGE"), None);
        assert_eq!(lookup(BackendKind::TabularStore, "ITKEEP"), Some(1 << 24));
        assert_eq!(lookup(BackendKind::OrderedCursor, "CPAFTER"), Some(2));
        assert_eq!(lookup(BackendKind::TabularQuery, "QCNOIDX"), Some(1 << 25));
        assert_eq!(lookup(BackendKind::TabularQuery, "MSDIFF"), Some(2));
        assert_eq!(lookup(BackendKind::AbstractStore, "OREADER"), None);
    }

    #[test]
    fn names_are_unique_per_class() {
        for kind in BackendKind::ALL {
            let mut names: Vec<&str> = class_constants(kind).map(|(n, _)| n).collect();
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), total, "{kind}");
        }
    }
}

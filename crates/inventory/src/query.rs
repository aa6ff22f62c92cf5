//! Filter/sort engine shared by the daily ledger and history views.
//!
//! Queries never reorder their input: `apply` borrows the fetched slice and
//! returns a freshly ordered view of references into it.

use core::cmp::Reverse;
use core::str::FromStr;

use chrono::NaiveDate;

use karatbook_core::{DomainError, Timestamp};

use crate::history::HistoryRecord;
use crate::ledger::{DailyLedgerEntry, LedgerStatus};
use crate::material::{Material, MaterialFilter};

/// A row the ledger query engine can filter and sort.
pub trait LedgerRow {
    fn item_name(&self) -> &str;
    fn recipient(&self) -> &str;
    fn material(&self) -> Material;
    fn status(&self) -> LedgerStatus;
    fn issued_at(&self) -> &Timestamp;
}

impl LedgerRow for DailyLedgerEntry {
    fn item_name(&self) -> &str {
        &self.item_name
    }

    fn recipient(&self) -> &str {
        &self.recipient
    }

    fn material(&self) -> Material {
        self.material
    }

    fn status(&self) -> LedgerStatus {
        self.status
    }

    fn issued_at(&self) -> &Timestamp {
        &self.issued_at
    }
}

impl LedgerRow for HistoryRecord {
    fn item_name(&self) -> &str {
        HistoryRecord::item_name(self)
    }

    fn recipient(&self) -> &str {
        HistoryRecord::recipient(self)
    }

    fn material(&self) -> Material {
        HistoryRecord::material(self)
    }

    fn status(&self) -> LedgerStatus {
        self.disposition().into()
    }

    fn issued_at(&self) -> &Timestamp {
        HistoryRecord::issued_at(self)
    }
}

/// Status selector; `All` is the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(LedgerStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: LedgerStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => *s == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        trimmed.parse().map(StatusFilter::Only)
    }
}

/// Sort key of the ledger and history views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerSort {
    #[default]
    ItemNameAsc,
    ItemNameDesc,
    DateAsc,
    DateDesc,
}

impl LedgerSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerSort::ItemNameAsc => "itemNameAsc",
            LedgerSort::ItemNameDesc => "itemNameDesc",
            LedgerSort::DateAsc => "dateAsc",
            LedgerSort::DateDesc => "dateDesc",
        }
    }

    fn sort<T: LedgerRow>(&self, rows: &mut [&T]) {
        match self {
            LedgerSort::ItemNameAsc => rows.sort_by_cached_key(|r| r.item_name().to_lowercase()),
            LedgerSort::ItemNameDesc => {
                rows.sort_by_cached_key(|r| Reverse(r.item_name().to_lowercase()))
            }
            LedgerSort::DateAsc => rows.sort_by(|a, b| a.issued_at().cmp(b.issued_at())),
            LedgerSort::DateDesc => rows.sort_by(|a, b| b.issued_at().cmp(a.issued_at())),
        }
    }
}

impl FromStr for LedgerSort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "itemnameasc" => Ok(LedgerSort::ItemNameAsc),
            "itemnamedesc" => Ok(LedgerSort::ItemNameDesc),
            "dateasc" => Ok(LedgerSort::DateAsc),
            "datedesc" => Ok(LedgerSort::DateDesc),
            other => Err(DomainError::validation(format!("unknown sort key '{other}'"))),
        }
    }
}

/// Inclusive calendar-date range. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// The end bound covers its whole day. With any bound set, a timestamp
    /// without a parseable date is outside the range.
    pub fn contains(&self, at: &Timestamp) -> bool {
        if self.is_open() {
            return true;
        }
        let Some(date) = at.date() else {
            return false;
        };
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

/// Filter parameters of a ledger or history view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerQuery {
    /// Case-insensitive item-name substring; empty disables it.
    pub item_name: String,
    /// Case-insensitive recipient substring; empty disables it.
    pub recipient: String,
    pub material: MaterialFilter,
    pub status: StatusFilter,
    pub sort: LedgerSort,
    /// Bypass filtering and sorting entirely.
    pub show_all: bool,
}

impl LedgerQuery {
    pub fn matches<T: LedgerRow>(&self, row: &T) -> bool {
        contains_ignore_case(row.item_name(), &self.item_name)
            && contains_ignore_case(row.recipient(), &self.recipient)
            && self.material.matches(row.material())
            && self.status.matches(row.status())
    }

    /// Derive the ordered view. `rows` itself is left untouched.
    pub fn apply<'a, T: LedgerRow>(&self, rows: &'a [T]) -> Vec<&'a T> {
        if self.show_all {
            return rows.iter().collect();
        }
        let mut view: Vec<&T> = rows.iter().filter(|row| self.matches(*row)).collect();
        self.sort.sort(&mut view);
        view
    }
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: usize,
        name: String,
        recipient: String,
        material: Material,
        status: LedgerStatus,
        at: Timestamp,
    }

    impl LedgerRow for Row {
        fn item_name(&self) -> &str {
            &self.name
        }

        fn recipient(&self) -> &str {
            &self.recipient
        }

        fn material(&self) -> Material {
            self.material
        }

        fn status(&self) -> LedgerStatus {
            self.status
        }

        fn issued_at(&self) -> &Timestamp {
            &self.at
        }
    }

    fn row(id: usize, name: &str) -> Row {
        Row {
            id,
            name: name.to_string(),
            recipient: "Asha".into(),
            material: Material::Gold,
            status: LedgerStatus::Pending,
            at: Timestamp::parse(format!("2026-10-{:02}T10:00:00Z", 1 + id % 28)),
        }
    }

    fn names<'a>(view: &[&'a Row]) -> Vec<&'a str> {
        view.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn name_ascending_sorts_case_insensitively() {
        let rows = vec![row(0, "Ring"), row(1, "chain"), row(2, "Bangle")];
        let view = LedgerQuery::default().apply(&rows);
        assert_eq!(names(&view), vec!["Bangle", "chain", "Ring"]);
        assert_eq!(rows[0].name, "Ring");
    }

    #[test]
    fn filters_combine_across_dimensions() {
        let mut silver = row(1, "Silver Chain");
        silver.material = Material::Silver;
        let mut other = row(2, "Chain");
        other.recipient = "Ravi".into();
        let rows = vec![row(0, "Gold Chain"), silver, other, row(3, "Ring")];

        let query = LedgerQuery {
            item_name: "CHAIN".into(),
            recipient: "ash".into(),
            material: "gold".parse().unwrap(),
            ..LedgerQuery::default()
        };
        assert_eq!(names(&query.apply(&rows)), vec!["Gold Chain"]);
    }

    #[test]
    fn status_filter_selects_matching_rows() {
        let mut sold = row(1, "Anklet");
        sold.status = LedgerStatus::Selled;
        let rows = vec![row(0, "Ring"), sold];
        let query = LedgerQuery {
            status: "selled".parse().unwrap(),
            ..LedgerQuery::default()
        };
        assert_eq!(names(&query.apply(&rows)), vec!["Anklet"]);
    }

    #[test]
    fn date_sorts_follow_parsed_instants() {
        let mut a = row(0, "A");
        a.at = Timestamp::parse("10/18/2026, 11:00:00 PM");
        let mut b = row(1, "B");
        b.at = Timestamp::parse("2026-10-19T01:00:00Z");
        let mut c = row(2, "C");
        c.at = Timestamp::parse("2026-10-02");
        let rows = vec![a, b, c];

        let asc = LedgerQuery {
            sort: LedgerSort::DateAsc,
            ..LedgerQuery::default()
        };
        assert_eq!(names(&asc.apply(&rows)), vec!["C", "A", "B"]);

        let desc = LedgerQuery {
            sort: "dateDesc".parse().unwrap(),
            ..LedgerQuery::default()
        };
        assert_eq!(names(&desc.apply(&rows)), vec!["B", "A", "C"]);
    }

    #[test]
    fn show_all_ignores_filters_and_keeps_source_order() {
        let rows = vec![row(0, "Ring"), row(1, "Chain")];
        let query = LedgerQuery {
            item_name: "zzz".into(),
            sort: LedgerSort::ItemNameAsc,
            show_all: true,
            ..LedgerQuery::default()
        };
        assert_eq!(names(&query.apply(&rows)), vec!["Ring", "Chain"]);
    }

    #[test]
    fn selector_strings_parse() {
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "Returned".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(LedgerStatus::Returned)
        );
        assert_eq!("ITEMNAMEDESC".parse::<LedgerSort>().unwrap(), LedgerSort::ItemNameDesc);
        assert!("weightAsc".parse::<LedgerSort>().is_err());
    }

    #[test]
    fn date_range_end_covers_whole_day() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19);
        let range = DateRange::new(day, day);
        assert!(range.contains(&Timestamp::parse("2026-10-19T23:59:59Z")));
        assert!(!range.contains(&Timestamp::parse("2026-10-20T00:00:00Z")));
        assert!(!range.contains(&Timestamp::parse("garbage")));
        assert!(DateRange::default().contains(&Timestamp::parse("garbage")));
    }

    fn arb_row() -> impl Strategy<Value = Row> {
        (
            "[a-cA-C]{0,4}",
            "[xyXY]{0,3}",
            any::<bool>(),
            0u8..3,
            0i64..2_000_000,
        )
            .prop_map(|(name, recipient, silver, status, secs)| Row {
                id: 0,
                name,
                recipient,
                material: if silver { Material::Silver } else { Material::Gold },
                status: match status {
                    0 => LedgerStatus::Pending,
                    1 => LedgerStatus::Selled,
                    _ => LedgerStatus::Returned,
                },
                at: Timestamp::from_datetime(
                    chrono::DateTime::from_timestamp(1_790_000_000 + secs, 0).unwrap_or_default(),
                ),
            })
    }

    fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
        prop::collection::vec(arb_row(), 0..40).prop_map(|mut rows| {
            for (i, r) in rows.iter_mut().enumerate() {
                r.id = i;
            }
            rows
        })
    }

    fn arb_query() -> impl Strategy<Value = LedgerQuery> {
        (
            "[a-cA-C]{0,2}",
            "[xyXY]{0,1}",
            prop::sample::select(vec!["all", "gold", "silver"]),
            prop::sample::select(vec!["all", "pending", "selled", "returned"]),
            prop::sample::select(vec!["itemNameAsc", "itemNameDesc", "dateAsc", "dateDesc"]),
        )
            .prop_map(|(item_name, recipient, material, status, sort)| LedgerQuery {
                item_name,
                recipient,
                material: material.parse().unwrap(),
                status: status.parse().unwrap(),
                sort: sort.parse().unwrap(),
                show_all: false,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn inactive_filters_keep_every_row_once(rows in arb_rows()) {
            let view = LedgerQuery::default().apply(&rows);
            let mut ids: Vec<usize> = view.iter().map(|r| r.id).collect();
            ids.sort_unstable();
            prop_assert_eq!(ids, (0..rows.len()).collect::<Vec<_>>());
        }

        #[test]
        fn filter_returns_exactly_the_matching_subset(rows in arb_rows(), query in arb_query()) {
            let view = query.apply(&rows);
            let mut got: Vec<usize> = view.iter().map(|r| r.id).collect();
            got.sort_unstable();
            let expected: Vec<usize> = rows
                .iter()
                .filter(|r| {
                    r.name.to_lowercase().contains(&query.item_name.to_lowercase())
                        && r.recipient.to_lowercase().contains(&query.recipient.to_lowercase())
                        && query.material.matches(r.material)
                        && query.status.matches(r.status)
                })
                .map(|r| r.id)
                .collect();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn sorted_views_are_ordered_by_key(rows in arb_rows(), query in arb_query()) {
            let view = query.apply(&rows);
            for pair in view.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                match query.sort {
                    LedgerSort::ItemNameAsc => prop_assert!(a.name.to_lowercase() <= b.name.to_lowercase()),
                    LedgerSort::ItemNameDesc => prop_assert!(a.name.to_lowercase() >= b.name.to_lowercase()),
                    LedgerSort::DateAsc => prop_assert!(a.at <= b.at),
                    LedgerSort::DateDesc => prop_assert!(a.at >= b.at),
                }
            }
        }

        #[test]
        fn apply_never_reorders_source(rows in arb_rows(), query in arb_query()) {
            let before = rows.clone();
            let _ = query.apply(&rows);
            prop_assert_eq!(rows, before);
        }
    }
}

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use stocklink_transfers::{Branch, OrderStatus, OrderView};

/// Branch-local wall clock.
///
/// Report dates and "today" are calendar dates in the branches' timezone, not
/// UTC.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LocalTime {
    offset: FixedOffset,
}

impl LocalTime {
    /// Offsets outside ±24h fall back to UTC.
    pub fn from_offset_minutes(minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// `dd/mm/yyyy hh:mm`, or `-` when absent.
    pub fn format(&self, at: Option<DateTime<Utc>>) -> String {
        match at {
            Some(at) => at.with_timezone(&self.offset).format("%d/%m/%Y %H:%M").to_string(),
            None => "-".to_string(),
        }
    }
}

impl Default for LocalTime {
    fn default() -> Self {
        Self::from_offset_minutes(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportFilter {
    #[serde(default, alias = "start", deserialize_with = "blank_as_none")]
    pub date_start: Option<NaiveDate>,
    #[serde(default, alias = "end", deserialize_with = "blank_as_none")]
    pub date_end: Option<NaiveDate>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub branch: Option<Branch>,
}

// Query strings send empty form fields as `start=`.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl ReportFilter {
    pub fn is_empty(&self) -> bool {
        self.date_start.is_none()
            && self.date_end.is_none()
            && self.username.as_deref().is_none_or(|u| u.trim().is_empty())
            && self.branch.is_none()
    }

    fn matches(&self, order: &OrderView, local: &LocalTime) -> bool {
        let date = local.date(order.created_at);
        if self.date_start.is_some_and(|start| date < start) {
            return false;
        }
        if self.date_end.is_some_and(|end| date > end) {
            return false;
        }
        if let Some(needle) = self.username.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            let haystack = order.created_by.username.to_lowercase();
            if !haystack.contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if self.branch.is_some_and(|b| b != order.from_branch) {
            return false;
        }
        true
    }
}

/// Where a report query comes from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReportMode {
    /// On-screen report. Starts blank and needs a full date range once any
    /// date is given.
    Interactive,
    /// PDF export. Applies whichever filters are present.
    Export,
}

/// Select non-draft orders matching `filter`, newest first.
pub fn query_orders<'a>(
    orders: impl IntoIterator<Item = &'a OrderView>,
    filter: &ReportFilter,
    mode: ReportMode,
    local: &LocalTime,
) -> Vec<OrderView> {
    if mode == ReportMode::Interactive {
        let partial_range = filter.date_start.is_some() != filter.date_end.is_some();
        if filter.is_empty() || partial_range {
            return Vec::new();
        }
    }

    let mut selected: Vec<OrderView> = orders
        .into_iter()
        .filter(|o| o.status != OrderStatus::Draft)
        .filter(|o| filter.matches(o, local))
        .cloned()
        .collect();

    selected.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.order_id.cmp(&a.order_id))
    });
    selected
}

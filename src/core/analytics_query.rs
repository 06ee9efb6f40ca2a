//! Structured query for the web-analytics reporting source.
//!
//! The model emits this shape as JSON; [`crate::core::validate`] checks it
//! against [`ALLOWED_METRICS`] and [`ALLOWED_DIMENSIONS`] before any
//! adapter call.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Metrics the analytics source may be asked for.
pub const ALLOWED_METRICS: &[&str] = &[
    "activeUsers",
    "sessions",
    "screenPageViews",
    "engagementRate",
    "averageEngagementTime",
    "eventCount",
    "conversions",
    "totalRevenue",
    "bounceRate",
];

/// Dimensions the analytics source may group or filter by.
pub const ALLOWED_DIMENSIONS: &[&str] = &[
    "pagePath",
    "pageTitle",
    "date",
    "sessionSource",
    "sessionMedium",
    "country",
    "city",
    "deviceCategory",
    "landingPage",
    "channelGroup",
];

/// Default window when the model omits `date_ranges`.
const DEFAULT_START: &str = "30daysAgo";
const DEFAULT_END: &str = "yesterday";

/// A `[start, end]` pair; each endpoint is `YYYY-MM-DD` or a relative token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DateRange {
    /// Inclusive start.
    pub start_date: String,
    /// Inclusive end.
    pub end_date: String,
}

impl DateRange {
    /// Creates a range from two endpoints.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start_date: start.into(),
            end_date: end.into(),
        }
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new(DEFAULT_START, DEFAULT_END)
    }
}

/// Single-dimension exact-match filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DimensionFilter {
    /// Dimension to match on.
    #[serde(alias = "dimension", alias = "field_name")]
    pub field: String,
    /// Value the dimension must equal.
    #[serde(alias = "match_value")]
    pub value: String,
}

/// Analytics variant of a structured query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalyticsQuery {
    /// Metric names, in request order.
    #[serde(default)]
    pub metrics: Vec<String>,
    /// Dimension names, in request order.
    #[serde(default)]
    pub dimensions: Vec<String>,
    /// One or more date windows.
    #[serde(default = "default_date_ranges", deserialize_with = "deserialize_date_ranges")]
    #[schemars(with = "Vec<DateRange>")]
    pub date_ranges: Vec<DateRange>,
    /// Optional dimension filter.
    #[serde(default, alias = "filters", skip_serializing_if = "Option::is_none")]
    pub filter: Option<DimensionFilter>,
}

fn default_date_ranges() -> Vec<DateRange> {
    vec![DateRange::default()]
}

/// Accepted wire forms for a single range.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRange {
    Pair([String; 2]),
    Object {
        #[serde(alias = "startDate", alias = "start")]
        start_date: String,
        #[serde(alias = "endDate", alias = "end")]
        end_date: String,
    },
}

impl From<RawRange> for DateRange {
    fn from(raw: RawRange) -> Self {
        match raw {
            RawRange::Pair([start, end]) | RawRange::Object {
                start_date: start,
                end_date: end,
            } => Self::new(start, end),
        }
    }
}

/// Accepted wire forms for the whole list: nested pairs/objects, or one flat pair.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRanges {
    Many(Vec<RawRange>),
    Flat([String; 2]),
    One(RawRange),
}

fn deserialize_date_ranges<'de, D>(deserializer: D) -> Result<Vec<DateRange>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawRanges>::deserialize(deserializer)?;
    let ranges: Vec<DateRange> = match raw {
        None => Vec::new(),
        Some(RawRanges::Many(list)) => list.into_iter().map(DateRange::from).collect(),
        Some(RawRanges::Flat([start, end])) => vec![DateRange::new(start, end)],
        Some(RawRanges::One(range)) => vec![range.into()],
    };
    if ranges.is_empty() {
        Ok(default_date_ranges())
    } else {
        Ok(ranges)
    }
}

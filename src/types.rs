use serde::Serialize;
use tabled::Tabled;

/// A date cell split into its parts. `month_index` is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub month_index: u32,
    pub day: u32,
    pub year: i32,
}

/// The single calendar month a report is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetMonth {
    pub month_index: u32,
    pub year: i32,
    pub days_in_month: u32,
    pub label: String,
}

impl TargetMonth {
    pub fn contains(&self, date: &DateParts) -> bool {
        self.year == date.year
            && self.month_index == date.month_index
            && (1..=self.days_in_month).contains(&date.day)
    }
}

/// One conversion row that survived month scoping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionEvent {
    pub offer: String,
    pub partner: String,
    pub code: String,
    pub day: u32,
    pub geo: String,
    pub payout: f64,
    pub revenue: f64,
    pub sale_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSummary {
    pub code: String,
    pub counts: Vec<u32>,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferSummary {
    pub offer: String,
    pub total: u32,
    pub codes: Vec<CodeSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferReport {
    pub offers: Vec<OfferSummary>,
    pub days_in_month: u32,
    pub month: Option<TargetMonth>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct DropAlert {
    #[tabled(rename = "Offer Name")]
    pub offer: String,
    #[tabled(rename = "Aff Name")]
    pub partner: String,
    #[tabled(rename = "Code")]
    pub code: String,
    #[tabled(skip)]
    pub day: u32,
    #[tabled(skip)]
    pub prev_day: u32,
    #[tabled(rename = "Prev Day")]
    pub prev_day_label: String,
    #[tabled(rename = "Prev Orders")]
    pub prev_day_count: u32,
    #[tabled(rename = "Day")]
    pub day_label: String,
    #[tabled(rename = "Orders")]
    pub day_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropAlertReport {
    pub alerts: Vec<DropAlert>,
    pub days_in_month: u32,
    pub month: Option<TargetMonth>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct OfferLastUpdate {
    #[tabled(rename = "Offer")]
    pub offer: String,
    #[tabled(skip)]
    pub day: u32,
    #[tabled(rename = "Last Update")]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    pub rows: Vec<ConversionEvent>,
    pub offers: Vec<String>,
    pub affiliates: Vec<String>,
    pub codes: Vec<String>,
    pub geos: Vec<String>,
    pub days_in_month: u32,
    pub month: Option<TargetMonth>,
    pub last_updates: Vec<OfferLastUpdate>,
}

/// How a day's count compares with its series' average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AvgLevel {
    VeryLow,
    Low,
    Normal,
    High,
}

/// Display status for one day cell of a code row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CellHighlight {
    None,
    Drop,
    ZeroRun,
    VeryLow,
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertFlags {
    pub drops: Vec<bool>,
    pub zero_runs: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeHighlights {
    pub code: String,
    pub average: f64,
    pub cells: Vec<CellHighlight>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferPerformance {
    pub offer: String,
    pub counts: Vec<u32>,
    pub total: u32,
    pub average: f64,
    /// `None` for days that are still in the future.
    pub levels: Vec<Option<AvgLevel>>,
}

/// Dimension selections for slicing analysis rows or drop alerts.
///
/// `None` means "everything"; `Some(vec![])` matches nothing, mirroring a
/// multi-select with every option unticked.
#[derive(Debug, Clone, Default)]
pub struct AnalysisFilter {
    pub offers: Option<Vec<String>>,
    pub affiliates: Option<Vec<String>>,
    pub codes: Option<Vec<String>>,
    pub geos: Option<Vec<String>>,
    pub day_from: Option<u32>,
    pub day_to: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct DayTotals {
    #[tabled(rename = "Day")]
    pub day: u32,
    #[tabled(rename = "Orders")]
    pub orders: u32,
    #[tabled(rename = "Revenue")]
    pub revenue: f64,
    #[tabled(rename = "Payout")]
    pub payout: f64,
    #[tabled(rename = "Sale Amount")]
    pub sale_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total_orders: u32,
    pub total_revenue: f64,
    pub total_payout: f64,
    pub total_sale_amount: f64,
    pub avg_order_value: f64,
    pub last_updated_day: u32,
    pub daily: Vec<DayTotals>,
}

// Flat rows for CSV export and console previews.

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CodeTotalRow {
    #[serde(rename = "Offer")]
    #[tabled(rename = "Offer")]
    pub offer: String,
    #[serde(rename = "Code")]
    #[tabled(rename = "Code")]
    pub code: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
    #[serde(rename = "Avg")]
    #[tabled(rename = "Avg")]
    pub avg: String,
    #[serde(rename = "FlaggedDays")]
    #[tabled(rename = "FlaggedDays")]
    pub flagged_days: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PerformanceRow {
    #[serde(rename = "Offer")]
    #[tabled(rename = "Offer")]
    pub offer: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
    #[serde(rename = "Avg")]
    #[tabled(rename = "Avg")]
    pub avg: String,
    #[serde(rename = "LowDays")]
    #[tabled(rename = "LowDays")]
    pub low_days: String,
    #[serde(rename = "HighDays")]
    #[tabled(rename = "HighDays")]
    pub high_days: String,
}

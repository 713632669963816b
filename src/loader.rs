use crate::types::{ConversionEvent, TargetMonth};
use crate::util::{
    days_in_month, month_label, non_blank_lines, parse_csv_line, parse_date_parts, parse_f64_or_zero,
};
use std::collections::HashMap;
use tracing::{debug, warn};

pub const DEFAULT_DAYS_IN_MONTH: u32 = 31;
pub const NO_GEO: &str = "no-geo";
const BOM: char = '\u{feff}';

/// Header columns of the conversion export, matched by exact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    OfferName,
    Partner,
    Date,
    Code,
    LowerGeo,
    Payout,
    Revenue,
    SaleAmount,
}

impl Column {
    pub fn header(self) -> &'static str {
        match self {
            Column::OfferName => "Offer Name",
            Column::Partner => "Partner",
            Column::Date => "Date",
            Column::Code => "Code",
            Column::LowerGeo => "Lower_Geo",
            Column::Payout => "Payout",
            Column::Revenue => "Revenue",
            Column::SaleAmount => "Sale Amount",
        }
    }

    const ALL: [Column; 8] = [
        Column::OfferName,
        Column::Partner,
        Column::Date,
        Column::Code,
        Column::LowerGeo,
        Column::Payout,
        Column::Revenue,
        Column::SaleAmount,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub data_lines: usize,
    pub accepted_rows: usize,
    pub missing_fields: usize,
    pub bad_dates: usize,
    pub out_of_month: usize,
    pub missing_columns: Vec<&'static str>,
}

/// Rows of one export, scoped to a single target month.
#[derive(Debug, Clone, Default)]
pub struct ScopedRows {
    pub month: Option<TargetMonth>,
    pub events: Vec<ConversionEvent>,
    pub report: LoadReport,
}

impl ScopedRows {
    pub fn days_in_month(&self) -> u32 {
        self.month
            .as_ref()
            .map_or(DEFAULT_DAYS_IN_MONTH, |m| m.days_in_month)
    }
}

struct HeaderIndex(HashMap<Column, usize>);

impl HeaderIndex {
    fn from_line(line: &str) -> Self {
        let header: Vec<String> = parse_csv_line(line)
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();
        let positions = Column::ALL
            .into_iter()
            .filter_map(|col| {
                header
                    .iter()
                    .position(|h| h == col.header())
                    .map(|idx| (col, idx))
            })
            .collect();
        Self(positions)
    }

    fn missing(&self, required: &[Column]) -> Vec<&'static str> {
        required
            .iter()
            .filter(|col| !self.0.contains_key(*col))
            .map(|col| col.header())
            .collect()
    }

    /// Trimmed cell for `col`, or `None` when the column or cell is absent.
    fn get<'a>(&self, row: &'a [String], col: Column) -> Option<&'a str> {
        let idx = *self.0.get(&col)?;
        row.get(idx).map(|v| v.trim())
    }
}

/// Parse a CSV export and keep only the rows of its target month.
///
/// The target month is taken from the first row (in file order) that has all
/// required text fields and a parseable date. Every later row must fall in
/// that same month, with a day inside the month, or it is dropped.
///
/// Missing required columns are not an error: the result is simply empty.
/// A leading byte order mark, as written by spreadsheet exports, is ignored.
pub fn scope_rows(csv_text: &str, required: &[Column]) -> ScopedRows {
    let csv_text = csv_text.strip_prefix(BOM).unwrap_or(csv_text);
    let mut lines = non_blank_lines(csv_text);
    let Some(header_line) = lines.next() else {
        debug!("no header line found");
        return ScopedRows::default();
    };

    let header = HeaderIndex::from_line(header_line);
    let missing_columns = header.missing(required);
    if !missing_columns.is_empty() {
        warn!(?missing_columns, "export is missing required columns");
        return ScopedRows {
            report: LoadReport {
                missing_columns,
                ..LoadReport::default()
            },
            ..ScopedRows::default()
        };
    }

    let needs_partner = required.contains(&Column::Partner);
    let mut report = LoadReport::default();
    let mut month: Option<TargetMonth> = None;
    let mut events = Vec::new();

    for line in lines {
        report.data_lines += 1;
        let row = parse_csv_line(line);

        let text = |col| header.get(&row, col).filter(|v| !v.is_empty());
        let (Some(offer), Some(code), Some(date)) =
            (text(Column::OfferName), text(Column::Code), text(Column::Date))
        else {
            report.missing_fields += 1;
            continue;
        };
        let partner = text(Column::Partner);
        if needs_partner && partner.is_none() {
            report.missing_fields += 1;
            continue;
        }

        let Some(date) = parse_date_parts(date) else {
            report.bad_dates += 1;
            continue;
        };

        let target = month.get_or_insert_with(|| {
            let days = days_in_month(date.year, date.month_index);
            debug!(year = date.year, month = date.month_index + 1, days, "target month established");
            TargetMonth {
                month_index: date.month_index,
                year: date.year,
                days_in_month: days,
                label: month_label(date.month_index, date.year),
            }
        });
        if !target.contains(&date) {
            report.out_of_month += 1;
            continue;
        }

        events.push(ConversionEvent {
            offer: offer.to_string(),
            partner: partner.unwrap_or_default().to_string(),
            code: code.to_string(),
            day: date.day,
            geo: text(Column::LowerGeo).unwrap_or(NO_GEO).to_string(),
            payout: parse_f64_or_zero(header.get(&row, Column::Payout)),
            revenue: parse_f64_or_zero(header.get(&row, Column::Revenue)),
            sale_amount: parse_f64_or_zero(header.get(&row, Column::SaleAmount)),
        });
    }

    report.accepted_rows = events.len();
    debug!(
        data_lines = report.data_lines,
        accepted = report.accepted_rows,
        missing_fields = report.missing_fields,
        bad_dates = report.bad_dates,
        out_of_month = report.out_of_month,
        "rows scoped"
    );

    ScopedRows {
        month,
        events,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: [Column; 3] = [Column::OfferName, Column::Date, Column::Code];

    #[test]
    fn empty_text_yields_default_scope() {
        let scoped = scope_rows("", &BASIC);
        assert!(scoped.events.is_empty());
        assert_eq!(scoped.month, None);
        assert_eq!(scoped.days_in_month(), 31);
    }

    #[test]
    fn missing_column_is_reported_not_raised() {
        let csv = "Offer Name,Date\nAcme,\"Jan 1, 2024\"\n";
        let scoped = scope_rows(csv, &BASIC);
        assert!(scoped.events.is_empty());
        assert_eq!(scoped.report.missing_columns, vec!["Code"]);
        assert_eq!(scoped.days_in_month(), 31);
    }

    #[test]
    fn first_valid_row_sets_target_month() {
        let csv = "Code,Offer Name,Date\n\
                   X1,,\"Mar 1, 2024\"\n\
                   X1,Acme,\"Feb 3, 2024\"\n\
                   X1,Acme,\"Mar 4, 2024\"\n\
                   X2,Acme,\"Feb 10, 2024\"\n";
        let scoped = scope_rows(csv, &BASIC);
        let month = scoped.month.clone().unwrap();
        assert_eq!((month.month_index, month.year), (1, 2024));
        assert_eq!(month.days_in_month, 29);
        assert_eq!(month.label, "February 2024");
        let days: Vec<u32> = scoped.events.iter().map(|e| e.day).collect();
        assert_eq!(days, vec![3, 10]);
        assert_eq!(scoped.report.missing_fields, 1);
        assert_eq!(scoped.report.out_of_month, 1);
    }

    #[test]
    fn out_of_range_day_is_dropped_after_month_is_set() {
        let csv = "Offer Name,Date,Code\nAcme,\"Feb 30, 2023\",X\nAcme,\"Feb 2, 2023\",X\n";
        let scoped = scope_rows(csv, &BASIC);
        assert_eq!(scoped.month.as_ref().map(|m| m.days_in_month), Some(28));
        assert_eq!(scoped.events.len(), 1);
        assert_eq!(scoped.events[0].day, 2);
    }

    #[test]
    fn bad_dates_do_not_establish_month() {
        let csv = "Offer Name,Date,Code\nAcme,\"Xyz 40, 2024\",X\nAcme,\"Apr 2, 2024\",X\n";
        let scoped = scope_rows(csv, &BASIC);
        assert_eq!(scoped.month.as_ref().map(|m| m.month_index), Some(3));
        assert_eq!(scoped.report.bad_dates, 1);
        assert_eq!(scoped.events.len(), 1);
    }

    #[test]
    fn partner_only_required_when_asked() {
        let csv = "Offer Name,Partner,Date,Code\nAcme,,\"Jan 1, 2024\",X\n";
        assert_eq!(scope_rows(csv, &BASIC).events.len(), 1);
        let with_partner = [Column::OfferName, Column::Partner, Column::Date, Column::Code];
        assert!(scope_rows(csv, &with_partner).events.is_empty());
    }

    #[test]
    fn geo_and_numbers_default_softly() {
        let csv = "Offer Name,Partner,Date,Code,Lower_Geo,Payout,Revenue,Sale Amount\n\
                   Acme,P1,\"Jan 1, 2024\",X, ,abc,12.5,\n";
        let scoped = scope_rows(csv, &Column::ALL);
        let event = &scoped.events[0];
        assert_eq!(event.geo, NO_GEO);
        assert_eq!(event.payout, 0.0);
        assert_eq!(event.revenue, 12.5);
        assert_eq!(event.sale_amount, 0.0);
    }

    #[test]
    fn byte_order_mark_before_header_is_ignored() {
        let csv = "\u{feff}Offer Name,Partner,Date,Code\nAcme,P1,\"Jan 1, 2024\",X\n";
        let scoped = scope_rows(csv, &BASIC);
        assert!(scoped.report.missing_columns.is_empty());
        assert_eq!(scoped.events.len(), 1);
        assert_eq!(scoped.events[0].offer, "Acme");
        assert_eq!(scoped.month.as_ref().map(|m| m.label.as_str()), Some("January 2024"));
    }

    #[test]
    fn fields_are_trimmed() {
        let csv = " Offer Name , Date , Code \n  Acme ,  Jan 9, 2024 ,X\n";
        // The unquoted date splits on its comma, so the row has no usable date.
        assert!(scope_rows(csv, &BASIC).events.is_empty());
        let csv = " Offer Name , Date , Code \n  Acme , \" Jan 9, 2024 \", X1 \n";
        let scoped = scope_rows(csv, &BASIC);
        assert_eq!(scoped.events[0].offer, "Acme");
        assert_eq!(scoped.events[0].code, "X1");
        assert_eq!(scoped.events[0].day, 9);
    }
}

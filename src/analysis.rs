// Views derived from already-built reports: dimension filters, KPI
// totals and the offer-level performance grid.
use crate::anomaly::{active_day_average, classify_ratio, is_future_day};
use crate::types::{
    AnalysisData, AnalysisFilter, AnalysisSummary, ConversionEvent, DayTotals, DropAlert,
    DropAlertReport, OfferPerformance,
};
use std::collections::HashMap;

fn selected(selection: &Option<Vec<String>>, value: &str) -> bool {
    selection
        .as_ref()
        .map_or(true, |values| values.iter().any(|v| v == value))
}

impl AnalysisFilter {
    pub fn matches_event(&self, event: &ConversionEvent) -> bool {
        selected(&self.offers, &event.offer)
            && selected(&self.affiliates, &event.partner)
            && selected(&self.codes, &event.code)
            && selected(&self.geos, &event.geo)
            && self.day_from.map_or(true, |from| event.day >= from)
            && self.day_to.map_or(true, |to| event.day <= to)
    }

    /// Alerts carry no geo, so only offer, affiliate, code and day apply.
    pub fn matches_alert(&self, alert: &DropAlert) -> bool {
        selected(&self.offers, &alert.offer)
            && selected(&self.affiliates, &alert.partner)
            && selected(&self.codes, &alert.code)
            && self.day_from.map_or(true, |from| alert.day >= from)
            && self.day_to.map_or(true, |to| alert.day <= to)
    }
}

pub fn filter_alerts<'a>(alerts: &'a [DropAlert], filter: &AnalysisFilter) -> Vec<&'a DropAlert> {
    alerts.iter().filter(|a| filter.matches_alert(a)).collect()
}

/// The same report with only the alerts that pass `filter`.
pub fn filter_alert_report(report: &DropAlertReport, filter: &AnalysisFilter) -> DropAlertReport {
    DropAlertReport {
        alerts: filter_alerts(&report.alerts, filter)
            .into_iter()
            .cloned()
            .collect(),
        days_in_month: report.days_in_month,
        month: report.month.clone(),
    }
}

/// KPI totals and a per-day breakdown over the rows that pass `filter`.
pub fn summarize(data: &AnalysisData, filter: &AnalysisFilter) -> AnalysisSummary {
    let mut daily: Vec<DayTotals> = (1..=data.days_in_month)
        .map(|day| DayTotals {
            day,
            ..DayTotals::default()
        })
        .collect();

    let mut summary = AnalysisSummary {
        total_orders: 0,
        total_revenue: 0.0,
        total_payout: 0.0,
        total_sale_amount: 0.0,
        avg_order_value: 0.0,
        last_updated_day: 0,
        daily: Vec::new(),
    };

    for row in data.rows.iter().filter(|r| filter.matches_event(r)) {
        summary.total_orders += 1;
        summary.total_revenue += row.revenue;
        summary.total_payout += row.payout;
        summary.total_sale_amount += row.sale_amount;
        summary.last_updated_day = summary.last_updated_day.max(row.day);

        let slot = row.day.checked_sub(1).map(|d| d as usize);
        if let Some(totals) = slot.and_then(|i| daily.get_mut(i)) {
            totals.orders += 1;
            totals.revenue += row.revenue;
            totals.payout += row.payout;
            totals.sale_amount += row.sale_amount;
        }
    }

    if summary.total_orders > 0 {
        summary.avg_order_value = summary.total_sale_amount / f64::from(summary.total_orders);
    }
    summary.daily = daily;
    summary
}

/// Daily orders per offer, each past day rated against the offer's average.
///
/// Unlike the per-code view there is no minimum volume here, and a past day
/// with no orders rates as very low.
pub fn offer_performance(data: &AnalysisData, max_past_day: u32) -> Vec<OfferPerformance> {
    let days = data.days_in_month as usize;
    let mut counts: HashMap<&str, Vec<u32>> = HashMap::new();
    for row in &data.rows {
        let Some(slot) = row.day.checked_sub(1).map(|d| d as usize).filter(|&i| i < days) else {
            continue;
        };
        counts
            .entry(row.offer.as_str())
            .or_insert_with(|| vec![0; days])[slot] += 1;
    }

    let mut rows: Vec<OfferPerformance> = counts
        .into_iter()
        .map(|(offer, counts)| {
            let average = active_day_average(&counts);
            let levels = counts
                .iter()
                .zip(1u32..)
                .map(|(&value, day)| {
                    (average > 0.0 && !is_future_day(day, max_past_day))
                        .then(|| classify_ratio(f64::from(value) / average))
                })
                .collect();
            OfferPerformance {
                offer: offer.to_string(),
                total: counts.iter().sum(),
                counts,
                average,
                levels,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.offer.cmp(&b.offer)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::build_analysis_data;
    use crate::types::AvgLevel;

    const HEADER: &str = "Offer Name,Partner,Date,Code,Lower_Geo,Payout,Revenue,Sale Amount";

    fn sample() -> AnalysisData {
        let csv = format!(
            "{HEADER}\n\
             Alpha,P1,\"Jan 1, 2024\",A1,us,1,10,100\n\
             Alpha,P2,\"Jan 1, 2024\",A2,ae,2,20,200\n\
             Alpha,P1,\"Jan 3, 2024\",A1,us,1,10,100\n\
             Beta,P1,\"Jan 2, 2024\",B1,us,5,50,500\n"
        );
        build_analysis_data(&csv)
    }

    fn pick(values: &[&str]) -> Option<Vec<String>> {
        Some(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn unfiltered_summary_covers_all_rows() {
        let data = sample();
        let summary = summarize(&data, &AnalysisFilter::default());
        assert_eq!(summary.total_orders, 4);
        assert_eq!(summary.total_revenue, 90.0);
        assert_eq!(summary.total_payout, 9.0);
        assert_eq!(summary.total_sale_amount, 900.0);
        assert_eq!(summary.avg_order_value, 225.0);
        assert_eq!(summary.last_updated_day, 3);
        assert_eq!(summary.daily.len(), 31);
        assert_eq!(summary.daily[0].orders, 2);
        assert_eq!(summary.daily[0].sale_amount, 300.0);
    }

    #[test]
    fn filters_narrow_by_dimension_and_day() {
        let data = sample();
        let filter = AnalysisFilter {
            offers: pick(&["Alpha"]),
            geos: pick(&["us"]),
            day_from: Some(2),
            ..AnalysisFilter::default()
        };
        let summary = summarize(&data, &filter);
        assert_eq!(summary.total_orders, 1);
        assert_eq!(summary.last_updated_day, 3);
    }

    #[test]
    fn empty_selection_matches_nothing() {
        let data = sample();
        let filter = AnalysisFilter {
            codes: Some(Vec::new()),
            ..AnalysisFilter::default()
        };
        let summary = summarize(&data, &filter);
        assert_eq!(summary.total_orders, 0);
        assert_eq!(summary.avg_order_value, 0.0);
        assert_eq!(summary.last_updated_day, 0);
    }

    #[test]
    fn offer_performance_rates_past_days_only() {
        let data = sample();
        let rows = offer_performance(&data, 2);
        assert_eq!(rows[0].offer, "Alpha");
        assert_eq!(rows[0].total, 3);
        // Alpha: 2 on day 1, 1 on day 3 -> average 1.5
        assert_eq!(rows[0].average, 1.5);
        assert_eq!(rows[0].levels[0], Some(AvgLevel::Normal));
        assert_eq!(rows[0].levels[1], Some(AvgLevel::VeryLow));
        assert_eq!(rows[0].levels[2], None);
        assert_eq!(rows[1].offer, "Beta");
        assert_eq!(rows[1].levels[1], Some(AvgLevel::Normal));
    }

    #[test]
    fn alerts_filter_on_selection() {
        let alert = DropAlert {
            offer: "Alpha".into(),
            partner: "P1".into(),
            code: "A1".into(),
            day: 4,
            prev_day: 3,
            prev_day_label: "January 3 2024".into(),
            prev_day_count: 30,
            day_label: "January 4 2024".into(),
            day_count: 2,
        };
        let alerts = vec![alert];
        assert_eq!(filter_alerts(&alerts, &AnalysisFilter::default()).len(), 1);
        let other = AnalysisFilter {
            affiliates: pick(&["P9"]),
            ..AnalysisFilter::default()
        };
        assert!(filter_alerts(&alerts, &other).is_empty());

        let report = DropAlertReport {
            alerts,
            days_in_month: 31,
            month: None,
        };
        let narrowed = filter_alert_report(&report, &other);
        assert!(narrowed.alerts.is_empty());
        assert_eq!(narrowed.days_in_month, 31);
        assert_eq!(filter_alert_report(&report, &AnalysisFilter::default()), report);
    }

    #[test]
    fn rows_outside_the_month_grid_are_skipped() {
        let mut data = sample();
        let mut stray = data.rows[0].clone();
        stray.day = 0;
        data.rows.push(stray.clone());
        stray.day = 40;
        data.rows.push(stray);

        let summary = summarize(&data, &AnalysisFilter::default());
        assert_eq!(summary.total_orders, 6);
        assert_eq!(summary.daily.iter().map(|d| d.orders).sum::<u32>(), 4);

        let rows = offer_performance(&data, 31);
        assert_eq!(rows[0].offer, "Alpha");
        assert_eq!(rows[0].total, 3);
    }
}

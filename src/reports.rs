use crate::loader::{scope_rows, Column};
use crate::types::{
    AnalysisData, CodeSummary, DropAlert, DropAlertReport, OfferLastUpdate, OfferReport,
    OfferSummary,
};
use crate::util::day_label;
use std::collections::{BTreeSet, HashMap};

const OFFER_COLUMNS: [Column; 3] = [Column::OfferName, Column::Date, Column::Code];
const DROP_COLUMNS: [Column; 4] = [Column::OfferName, Column::Partner, Column::Date, Column::Code];
const ANALYSIS_COLUMNS: [Column; 8] = [
    Column::OfferName,
    Column::Partner,
    Column::Date,
    Column::Code,
    Column::LowerGeo,
    Column::Payout,
    Column::Revenue,
    Column::SaleAmount,
];

// Drop alerts only look at codes with at least this many orders in the month.
const ALERT_MIN_MONTH_ORDERS: u32 = 5;
const ALERT_DROP_MIN_PREV: u32 = 20;
const ALERT_DROP_RATIO: f64 = 0.5;
const ALERT_ZERO_MIN_PREV: u32 = 6;

/// Offer → code daily conversion matrices for the target month.
///
/// Codes are ordered by total descending then code name; offers likewise.
pub fn build_offer_report(csv_text: &str) -> OfferReport {
    let scoped = scope_rows(csv_text, &OFFER_COLUMNS);
    let days = scoped.days_in_month();

    let mut offers: HashMap<String, HashMap<String, Vec<u32>>> = HashMap::new();
    for event in &scoped.events {
        let counts = offers
            .entry(event.offer.clone())
            .or_default()
            .entry(event.code.clone())
            .or_insert_with(|| vec![0; days as usize]);
        counts[event.day as usize - 1] += 1;
    }

    let mut summaries: Vec<OfferSummary> = offers
        .into_iter()
        .map(|(offer, codes)| {
            let mut codes: Vec<CodeSummary> = codes
                .into_iter()
                .map(|(code, counts)| CodeSummary {
                    total: counts.iter().sum(),
                    code,
                    counts,
                })
                .collect();
            codes.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.code.cmp(&b.code)));
            OfferSummary {
                total: codes.iter().map(|c| c.total).sum(),
                offer,
                codes,
            }
        })
        .collect();
    summaries.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.offer.cmp(&b.offer)));

    OfferReport {
        offers: summaries,
        days_in_month: days,
        month: scoped.month,
    }
}

/// Day-over-day drops per (offer, partner, code), latest days first.
///
/// `max_past_day` limits evaluation to days with complete data; it defaults
/// to the whole month. A day is only reported when the offer as a whole had
/// sales that day, so a late data load for the offer is not mistaken for a
/// drop.
pub fn build_drop_alerts(csv_text: &str, max_past_day: Option<u32>) -> DropAlertReport {
    struct Series {
        offer: String,
        partner: String,
        code: String,
        counts: Vec<u32>,
    }

    let scoped = scope_rows(csv_text, &DROP_COLUMNS);
    let days = scoped.days_in_month();

    // Vec + index keeps first-seen order for the stable sort below.
    let mut series: Vec<Series> = Vec::new();
    let mut index: HashMap<(String, String, String), usize> = HashMap::new();
    let mut offer_counts: HashMap<String, Vec<u32>> = HashMap::new();

    for event in &scoped.events {
        let slot = event.day as usize - 1;
        let key = (event.offer.clone(), event.partner.clone(), event.code.clone());
        let pos = *index.entry(key).or_insert_with(|| {
            series.push(Series {
                offer: event.offer.clone(),
                partner: event.partner.clone(),
                code: event.code.clone(),
                counts: vec![0; days as usize],
            });
            series.len() - 1
        });
        series[pos].counts[slot] += 1;

        offer_counts
            .entry(event.offer.clone())
            .or_insert_with(|| vec![0; days as usize])[slot] += 1;
    }

    let last_day = days.min(max_past_day.unwrap_or(days));
    // Only used for labels; there is always a month when there are events.
    let (month_index, year) = scoped
        .month
        .as_ref()
        .map_or((0, 0), |m| (m.month_index, m.year));
    let mut alerts = Vec::new();
    let mut seen: BTreeSet<(&str, &str, &str, u32)> = BTreeSet::new();

    for entry in &series {
        let month_orders: u32 = entry.counts.iter().sum();
        if month_orders < ALERT_MIN_MONTH_ORDERS {
            continue;
        }
        let offer_daily = offer_counts.get(&entry.offer);

        for day in 2..=last_day {
            let prev = entry.counts[day as usize - 2];
            let cur = entry.counts[day as usize - 1];
            let offer_has_sales = offer_daily.is_some_and(|c| c[day as usize - 1] > 0);

            let is_drop = prev > ALERT_DROP_MIN_PREV
                && f64::from(cur) <= f64::from(prev) * ALERT_DROP_RATIO;
            let is_zero_after_sales = prev >= ALERT_ZERO_MIN_PREV && cur == 0;
            if !offer_has_sales || !(is_drop || is_zero_after_sales) {
                continue;
            }
            let key = (entry.offer.as_str(), entry.partner.as_str(), entry.code.as_str(), day);
            if !seen.insert(key) {
                continue;
            }

            alerts.push(DropAlert {
                offer: entry.offer.clone(),
                partner: entry.partner.clone(),
                code: entry.code.clone(),
                day,
                prev_day: day - 1,
                prev_day_label: day_label(month_index, day - 1, year),
                prev_day_count: prev,
                day_label: day_label(month_index, day, year),
                day_count: cur,
            });
        }
    }

    alerts.sort_by(|a, b| b.day.cmp(&a.day));

    DropAlertReport {
        alerts,
        days_in_month: days,
        month: scoped.month,
    }
}

/// Flat, month-scoped rows plus the distinct values of each dimension.
pub fn build_analysis_data(csv_text: &str) -> AnalysisData {
    let scoped = scope_rows(csv_text, &ANALYSIS_COLUMNS);
    let days = scoped.days_in_month();

    let mut offers = BTreeSet::new();
    let mut affiliates = BTreeSet::new();
    let mut codes = BTreeSet::new();
    let mut geos = BTreeSet::new();
    let mut last_day: Vec<(String, u32)> = Vec::new();
    let mut last_index: HashMap<&str, usize> = HashMap::new();

    for event in &scoped.events {
        offers.insert(event.offer.clone());
        affiliates.insert(event.partner.clone());
        codes.insert(event.code.clone());
        geos.insert(event.geo.clone());

        let pos = *last_index.entry(event.offer.as_str()).or_insert_with(|| {
            last_day.push((event.offer.clone(), 0));
            last_day.len() - 1
        });
        let latest = &mut last_day[pos].1;
        *latest = (*latest).max(event.day);
    }

    let mut last_updates: Vec<OfferLastUpdate> = match &scoped.month {
        Some(month) => last_day
            .into_iter()
            .map(|(offer, day)| OfferLastUpdate {
                offer,
                day,
                label: day_label(month.month_index, day, month.year),
            })
            .collect(),
        None => Vec::new(),
    };
    last_updates.sort_by(|a, b| b.day.cmp(&a.day));

    AnalysisData {
        rows: scoped.events,
        offers: offers.into_iter().collect(),
        affiliates: affiliates.into_iter().collect(),
        codes: codes.into_iter().collect(),
        geos: geos.into_iter().collect(),
        days_in_month: days,
        month: scoped.month,
        last_updates,
    }
}

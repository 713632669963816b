// Day-by-day heuristics over a single daily count matrix.
//
// All thresholds are fixed. `max_past_day` is the last day with complete
// data; anything after it is treated as not yet elapsed.
use crate::types::{AlertFlags, AvgLevel, CellHighlight, CodeHighlights, CodeSummary, TargetMonth};
use chrono::{Datelike, NaiveDate};
use std::cmp::Ordering;

const CELL_DROP_MIN_PREV: u32 = 15;
const CELL_DROP_RATIO: f64 = 0.6;
const ZERO_RUN_MIN_DAYS: usize = 3;
const AVG_ALERT_MIN: f64 = 10.0;
const VERY_LOW_RATIO: f64 = 0.5;
const LOW_RATIO: f64 = 0.75;
const HIGH_RATIO: f64 = 1.4;

/// Last day of the target month whose data is considered complete.
///
/// Past months are fully elapsed, future months not at all. In the current
/// month today is excluded since its data is still arriving. Without a
/// target month every day counts as past.
pub fn max_past_day(month: Option<&TargetMonth>, days_in_month: u32, today: NaiveDate) -> u32 {
    let Some(month) = month else {
        return days_in_month;
    };
    match (month.year, month.month_index).cmp(&(today.year(), today.month0())) {
        Ordering::Less => days_in_month,
        Ordering::Greater => 0,
        Ordering::Equal => today.day().saturating_sub(1).min(days_in_month),
    }
}

/// Cell-level drop: yesterday above 15 and today under 60% of it.
pub fn drop_flags(counts: &[u32]) -> Vec<bool> {
    let mut flags = vec![false; counts.len()];
    for (i, pair) in counts.windows(2).enumerate() {
        let (prev, cur) = (pair[0], pair[1]);
        flags[i + 1] = prev > CELL_DROP_MIN_PREV && f64::from(cur) < f64::from(prev) * CELL_DROP_RATIO;
    }
    flags
}

/// Flag runs of three or more zero days that follow a day with sales.
///
/// Only days up to `max_past_day` are considered part of a run.
pub fn zero_run_flags(counts: &[u32], max_past_day: u32) -> Vec<bool> {
    let mut flags = vec![false; counts.len()];
    let past = counts.len().min(max_past_day as usize);

    let mut i = 1;
    while i < past {
        if counts[i - 1] == 0 || counts[i] != 0 {
            i += 1;
            continue;
        }
        let run_end = (i..past).find(|&j| counts[j] != 0).unwrap_or(past);
        if run_end - i >= ZERO_RUN_MIN_DAYS {
            flags[i..run_end].fill(true);
        }
        i = run_end.max(i + 1);
    }
    flags
}

pub fn alert_flags(counts: &[u32], max_past_day: u32) -> AlertFlags {
    AlertFlags {
        drops: drop_flags(counts),
        zero_runs: zero_run_flags(counts, max_past_day),
    }
}

/// Mean over days that had at least one conversion; 0 when there were none.
pub fn active_day_average(counts: &[u32]) -> f64 {
    let active = counts.iter().filter(|&&v| v > 0).count();
    if active == 0 {
        return 0.0;
    }
    let total: u64 = counts.iter().map(|&v| u64::from(v)).sum();
    total as f64 / active as f64
}

pub fn classify_ratio(ratio: f64) -> AvgLevel {
    if ratio < VERY_LOW_RATIO {
        AvgLevel::VeryLow
    } else if ratio < LOW_RATIO {
        AvgLevel::Low
    } else if ratio > HIGH_RATIO {
        AvgLevel::High
    } else {
        AvgLevel::Normal
    }
}

pub fn is_future_day(day: u32, max_past_day: u32) -> bool {
    max_past_day == 0 || day > max_past_day
}

/// Compare each past day with a positive count against the code's average.
///
/// Codes averaging under 10 a day are left unclassified (all `None`), as are
/// future days and days without sales.
pub fn average_levels(counts: &[u32], max_past_day: u32) -> Vec<Option<AvgLevel>> {
    let avg = active_day_average(counts);
    if avg < AVG_ALERT_MIN {
        return vec![None; counts.len()];
    }
    counts
        .iter()
        .zip(1u32..)
        .map(|(&value, day)| {
            (value > 0 && !is_future_day(day, max_past_day))
                .then(|| classify_ratio(f64::from(value) / avg))
        })
        .collect()
}

/// Combine every per-day heuristic into the single status a table cell shows.
///
/// A cell-level drop wins outright. Past days then fall through zero-run,
/// very-low, low and high, in that order.
pub fn cell_highlights(counts: &[u32], max_past_day: u32) -> Vec<CellHighlight> {
    let flags = alert_flags(counts, max_past_day);
    let levels = average_levels(counts, max_past_day);

    (0..counts.len())
        .map(|idx| {
            if flags.drops[idx] {
                return CellHighlight::Drop;
            }
            if is_future_day(idx as u32 + 1, max_past_day) {
                return CellHighlight::None;
            }
            if flags.zero_runs[idx] {
                return CellHighlight::ZeroRun;
            }
            match levels[idx] {
                Some(AvgLevel::VeryLow) => CellHighlight::VeryLow,
                Some(AvgLevel::Low) => CellHighlight::Low,
                Some(AvgLevel::High) => CellHighlight::High,
                Some(AvgLevel::Normal) | None => CellHighlight::None,
            }
        })
        .collect()
}

pub fn code_highlights(summary: &CodeSummary, max_past_day: u32) -> CodeHighlights {
    CodeHighlights {
        code: summary.code.clone(),
        average: active_day_average(&summary.counts),
        cells: cell_highlights(&summary.counts, max_past_day),
    }
}

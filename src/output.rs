use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    info!(path = %path.display(), "wrote json");
    Ok(())
}

/// Render at most `max_rows` rows as a markdown table.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    println!("{}\n", render_table(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DayTotals;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("conversion_report_{}_{}", std::process::id(), name));
        path
    }

    #[test]
    fn render_table_limits_rows() {
        let rows: Vec<DayTotals> = (1..=3)
            .map(|day| DayTotals {
                day,
                ..DayTotals::default()
            })
            .collect();
        let table = render_table(&rows, 2);
        assert!(table.contains("Sale Amount"));
        assert_eq!(table.lines().count(), 4);
        assert_eq!(render_table::<DayTotals>(&[], 2), "(no rows)");
    }

    #[test]
    fn csv_and_json_round_out_to_disk() {
        let rows = vec![DayTotals {
            day: 1,
            orders: 2,
            revenue: 3.5,
            payout: 1.0,
            sale_amount: 10.0,
        }];

        let csv_path = temp_path("daily.csv");
        write_csv(&csv_path, &rows).unwrap();
        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(text.lines().next(), Some("day,orders,revenue,payout,saleAmount"));
        assert_eq!(text.lines().nth(1), Some("1,2,3.5,1.0,10.0"));

        let json_path = temp_path("daily.json");
        write_json(&json_path, &rows).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value[0]["saleAmount"], 10.0);

        let _ = std::fs::remove_file(csv_path);
        let _ = std::fs::remove_file(json_path);
    }
}

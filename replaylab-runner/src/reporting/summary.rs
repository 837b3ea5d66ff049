//! Plain-text performance summary.

use std::fmt::Write;

use crate::result::BacktestResult;

pub const NOT_ENOUGH_DATA: &str = "Not enough data to calculate performance.";

/// Render the summary block printed after a run.
pub fn render_summary(result: &BacktestResult) -> String {
    if !result.has_enough_data() {
        return format!("{NOT_ENOUGH_DATA}\n");
    }
    let m = &result.metrics;
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "--- Performance Summary ---");
    let _ = writeln!(out, "Initial Capital: {}", format_currency(m.initial_capital));
    let _ = writeln!(out, "Final Equity:    {}", format_currency(m.final_equity));
    if (m.final_equity - m.curve_final_equity).abs() >= 0.005 {
        // Fills on the last bar are not in the curve the drawdown is computed over.
        let _ = writeln!(out, "Curve End:       {}", format_currency(m.curve_final_equity));
    }
    let _ = writeln!(out, "Total Return:    {:.2}%", m.total_return * 100.0);
    let _ = writeln!(out, "Sharpe Ratio:    {:.2}", m.sharpe);
    let _ = writeln!(out, "Max Drawdown:    {:.2}%", m.max_drawdown * 100.0);
    let _ = writeln!(out, "Fills:           {}", m.fill_count);
    let _ = writeln!(out, "Commission:      {}", format_currency(m.total_commission));
    let _ = writeln!(out, "Dropped Orders:  {}", result.dropped_orders.len());
    if !result.warnings.is_empty() {
        let _ = writeln!(out, "Data Warnings:   {}", result.warnings.len());
    }
    out
}

/// `$1,234,567.89`, with a leading `-` for negatives.
pub fn format_currency(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{frac_part}")
}

//! Output formatting utilities

use super::time::{format_capture_time, format_reset_time};
use crate::types::{QuotaInfo, Tier, UsageData};
use colored::{Color, Colorize};
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

const MODEL_COLUMN_WIDTH: usize = 32;
const BAR_WIDTH: usize = 20;

/// Color for a usage percentage: green below 50, yellow below 80, red otherwise
pub fn status_color(percent: f64) -> Color {
    if percent < 50.0 {
        Color::Green
    } else if percent < 80.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Plain `█░` bar, `width` cells wide
pub fn create_progress_bar(percent: f64, width: usize) -> String {
    let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Cut `s` to at most `max` characters, ending in `...` when shortened
pub fn truncate_string(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return ".".repeat(max);
    }
    let kept: String = s.chars().take(max - 3).collect();
    format!("{}...", kept)
}

/// Quota value without a trailing `.0`
fn format_amount(value: f64) -> String {
    if value.fract().abs() < 0.05 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// Table row for display
#[derive(Tabled)]
pub struct QuotaRow {
    #[tabled(rename = "Model")]
    pub model: String,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "Limit")]
    pub limit: String,
    #[tabled(rename = "Left")]
    pub left: String,
    #[tabled(rename = "Usage")]
    pub usage: String,
    #[tabled(rename = "Resets In")]
    pub resets_in: String,
}

impl QuotaRow {
    fn from_quota(quota: &QuotaInfo) -> Self {
        if quota.limit <= 0.0 {
            return Self {
                model: truncate_string(&quota.model_name, MODEL_COLUMN_WIDTH),
                used: "-".to_string(),
                limit: "-".to_string(),
                left: "-".to_string(),
                usage: "no quota data".dimmed().to_string(),
                resets_in: format_reset_time(&quota.reset_time),
            };
        }

        let color = status_color(quota.usage_percent);
        let bar = create_progress_bar(quota.usage_percent, BAR_WIDTH);
        Self {
            model: truncate_string(&quota.model_name, MODEL_COLUMN_WIDTH),
            used: format_amount(quota.used),
            limit: format_amount(quota.limit),
            left: format_amount(quota.remaining),
            usage: format!("{} {:>3.0}%", bar.color(color), quota.usage_percent),
            resets_in: format_reset_time(&quota.reset_time),
        }
    }
}

/// Format a snapshot as a table with a cached-data banner and account footer
pub fn format_table(data: &UsageData, tier: Tier) -> String {
    let mut out = String::new();

    if data.is_cached || !tier.is_live() {
        out.push_str(&format!(
            "{}\n\n",
            format!(
                "⚠ Showing cached data from {} (live sources unavailable)",
                format_capture_time(data.fetched_at)
            )
            .yellow()
        ));
    }

    if data.models.is_empty() {
        out.push_str(&format!("{}\n", "No model quota reported.".dimmed()));
    } else {
        let rows: Vec<QuotaRow> = data.models.iter().map(QuotaRow::from_quota).collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::single(0)).with(Alignment::left()))
            .with(Modify::new(Columns::new(1..4)).with(Alignment::right()))
            .to_string();
        out.push_str(&table);
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&format!("  {} {}\n", "Source:".bold(), tier));
    if !data.tier.is_empty() {
        out.push_str(&format!("  {} {}\n", "Plan:".bold(), data.tier));
    }
    if data.prompt_credit > 0 {
        out.push_str(&format!("  {} {}\n", "Prompt credits:".bold(), data.prompt_credit));
    }
    match (data.name.is_empty(), data.email.is_empty()) {
        (false, false) => out.push_str(&format!("  {} {} <{}>\n", "Account:".bold(), data.name, data.email)),
        (true, false) => out.push_str(&format!("  {} {}\n", "Account:".bold(), data.email)),
        (false, true) => out.push_str(&format!("  {} {}\n", "Account:".bold(), data.name)),
        (true, true) => {}
    }

    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    source: Tier,
    #[serde(flatten)]
    data: &'a UsageData,
}

/// Format a snapshot as pretty JSON with a `source` field
pub fn format_json(data: &UsageData, tier: Tier) -> String {
    serde_json::to_string_pretty(&JsonReport { source: tier, data }).unwrap_or_else(|_| "{}".to_string())
}

/// Print banner
pub fn print_banner() {
    println!();
    println!("{}", "  agusage - Antigravity Quota Monitor".cyan().bold());
    println!();
}

use chrono::DateTime;
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table,
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_BORDERS_ONLY,
};

use crate::aggregator::SourceResult;
use crate::analysis::AnalysisReport;
use crate::movers::MoverEntry;
use crate::recommendation::Basis;
use crate::search::SymbolMatch;

fn get_visibility_ratio(current_pct: f64, top_pct: f64) -> f64 {
    let mut ratio = 0.4 + 0.6 * (current_pct / top_pct);
    if ratio < 0.4 {
        ratio = 0.4;
    }
    ratio
}

fn format_timestamp(ts_ms: i64) -> String {
    let seconds = ts_ms / 1000;
    let nanoseconds = ((ts_ms % 1000) * 1_000_000) as u32;

    if let Some(dt) = DateTime::from_timestamp(seconds, nanoseconds) {
        return dt.format("%d-%m-%Y %H:%M:%S").to_string();
    }
    "Unknown Time".to_string()
}

pub fn print_movers(movers: &[MoverEntry]) {
    if movers.is_empty() {
        println!("No movers could be ranked.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Rank").add_attribute(Attribute::Bold),
            Cell::new("Symbol").add_attribute(Attribute::Bold),
            Cell::new("Change (%)")
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Right),
        ]);

    let top_pct = movers[0].change_pct;
    let safe_top_pct = if top_pct == 0.0 { 1.0 } else { top_pct };

    for (idx, entry) in movers.iter().enumerate() {
        let rank_cell = Cell::new(idx + 1).fg(Color::DarkGrey);

        let ratio = get_visibility_ratio(entry.change_pct, safe_top_pct);
        let shade = (255.0 * ratio) as u8;

        let symbol_cell = Cell::new(&entry.symbol).fg(Color::Rgb { r: 0, g: shade, b: shade });

        let pct_color = if entry.change_pct < 0.0 {
            Color::Rgb { r: 200, g: 60, b: 60 }
        } else {
            Color::Rgb { r: 0, g: shade, b: 0 }
        };
        let pct_cell = Cell::new(format!("{:+.2}%", entry.change_pct))
            .fg(pct_color)
            .set_alignment(CellAlignment::Right);

        table.add_row(vec![rank_cell, symbol_cell, pct_cell]);
    }

    println!("\n{table}");
}

pub fn print_matches(matches: &[SymbolMatch]) {
    if matches.is_empty() {
        println!("No matches.");
        return;
    }
    for m in matches {
        println!("{} - {}", m.symbol, m.name);
    }
}

fn source_status<T>(result: &SourceResult<T>) -> String {
    if result.ok {
        "ok".to_string()
    } else {
        format!("failed ({})", result.error.as_deref().unwrap_or("unknown"))
    }
}

pub fn print_report(report: &AnalysisReport) {
    let ctx = &report.context;
    println!("\n=== {} ===", ctx.symbol);

    match ctx.price.value() {
        Some(candles) if !candles.is_empty() => {
            let last = &candles[candles.len() - 1];
            println!(
                "Candles: {} samples, last close {:.2} at {} UTC",
                candles.len(),
                last.c,
                format_timestamp(last.t)
            );
        }
        Some(_) => println!("Candles: no data yet"),
        None => println!("Candles: unavailable"),
    }

    if let Some(rsi) = report.rsi {
        println!("RSI: {rsi:.1}");
    }

    println!(
        "Signals: {} buy / {} sell",
        report.signals.buys.len(),
        report.signals.sells.len()
    );
    for signal in report.signals.buys.iter().rev().take(3) {
        println!("  buy  {:>10.2} at {}", signal.y, format_timestamp(signal.x));
    }
    for signal in report.signals.sells.iter().rev().take(3) {
        println!("  sell {:>10.2} at {}", signal.y, format_timestamp(signal.x));
    }

    println!("\nSources:");
    println!("  price:  {}", source_status(&ctx.price));
    println!("  news:   {}", source_status(&ctx.news));
    println!("  social: {}", source_status(&ctx.social));
    println!("  ai:     {}", source_status(&ctx.auxiliary_analysis));

    if let Some(news) = ctx.news.value() {
        for article in news.iter().take(3) {
            println!("  - {}", article.title);
        }
    }

    if let Some(aux) = ctx.auxiliary_analysis.value() {
        println!("\nMarket read: {aux}");
    }

    let basis = match report.recommendation.basis {
        Basis::Ai => "ai",
        Basis::Heuristic => "heuristic",
    };
    println!("\nRecommendation [{}]: {}", basis, report.recommendation.text);
}

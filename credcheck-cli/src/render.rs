//! Terminal rendering of display models and session effects.

use colored::{ColoredString, Colorize};
use credcheck_core::presentation::{FieldRow, ScoreRow};
use credcheck_core::{DisplayModel, Effect, ScoreBand, ScoreDisplay, Tone};

const BAR_WIDTH: usize = 20;

/// Apply the presentation effects a transition emitted.
///
/// Only progress and inline errors have a terminal counterpart; input
/// enabling and scrolling are browser concerns. Inline errors are printed
/// even when `quiet`.
pub fn apply_effects(effects: &[Effect], quiet: bool) {
    for effect in effects {
        match effect {
            Effect::ShowProgress(stages) if !quiet => {
                for stage in stages {
                    eprintln!("   {} {}", "→".cyan(), stage.label().dimmed());
                }
            }
            Effect::ShowInlineError(message) => eprintln!("{} {message}", "Error:".red().bold()),
            _ => {}
        }
    }
}

fn paint(text: &str, tone: Tone) -> ColoredString {
    match tone {
        Tone::Positive => text.green(),
        Tone::Warning => text.yellow(),
        Tone::Negative => text.red(),
        Tone::Busy => text.cyan(),
        Tone::Neutral => text.normal(),
    }
}

fn banner(headline: &str, tone: Tone) {
    let width = headline.chars().count().max(38) + 2;
    let pad = width - headline.chars().count();
    let left = pad / 2;
    println!();
    println!("{}", paint(&format!("╔{}╗", "═".repeat(width)), tone));
    println!(
        "{}",
        paint(
            &format!("║{}{}{}║", " ".repeat(left), headline, " ".repeat(pad - left)),
            tone
        )
        .bold()
    );
    println!("{}", paint(&format!("╚{}╝", "═".repeat(width)), tone));
    println!();
}

fn section(title: &str, rows: &[FieldRow]) {
    if rows.is_empty() {
        return;
    }
    println!("   {}", title.bold());
    for row in rows {
        println!("   {:<22} {}", format!("{}:", row.label).dimmed(), row.value);
    }
    println!();
}

pub fn score_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn score_line(row: &ScoreRow) -> String {
    match &row.display {
        ScoreDisplay::Check { passed: true } => "✓".green().to_string(),
        ScoreDisplay::Check { passed: false } => "✗".red().to_string(),
        ScoreDisplay::Bar { percent, band } => {
            let text = format!("{} {:>5.1}%", score_bar(*percent), percent);
            match band {
                ScoreBand::Green => text.green().to_string(),
                ScoreBand::Amber => text.yellow().to_string(),
                ScoreBand::Red => text.red().to_string(),
            }
        }
    }
}

/// Print a display model as a boxed headline followed by its sections.
pub fn print_model(model: &DisplayModel) {
    banner(&model.headline, model.tone);

    if let Some(message) = &model.message {
        println!("   {}", paint(message, model.tone));
        println!();
    }

    section("Extracted", &model.extracted);
    section("Matched record", &model.matched_record);
    section("Forgery check", &model.forgery);

    if let Some(confidence) = model.overall_confidence {
        println!(
            "   {:<22} {:.1}%",
            "Overall confidence:".dimmed(),
            confidence
        );
    }
    for row in &model.scores {
        println!(
            "   {:<22} {}",
            format!("{}:", row.label).dimmed(),
            score_line(row)
        );
    }
}

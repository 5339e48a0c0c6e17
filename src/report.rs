use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{GradeStats, RiskScore, TeachingUnit};
use crate::risk;
use crate::stats;

#[derive(Debug, Clone)]
pub struct UnitSummary<'a> {
    pub unit: &'a TeachingUnit,
    pub stats: GradeStats,
    pub risk: RiskScore,
}

/// Units with their stats and risk, riskiest first. Ties keep entry order.
pub fn summarize_units(units: &[TeachingUnit]) -> Vec<UnitSummary<'_>> {
    let mut summaries: Vec<UnitSummary<'_>> = units
        .iter()
        .map(|unit| {
            let stats = stats::unit_stats(unit);
            UnitSummary {
                unit,
                stats,
                risk: risk::risk_score(unit, &stats),
            }
        })
        .collect();

    summaries.sort_by(|a, b| b.risk.score.cmp(&a.risk.score));
    summaries
}

fn write_stats(output: &mut String, label: &str, stats: &GradeStats) {
    if !stats.has_data() {
        let _ = writeln!(output, "- {label}: no grades yet");
        return;
    }
    let _ = writeln!(
        output,
        "- {}: current {:.2} ({}), worst {:.2}, best {:.2}, weight {}",
        label,
        stats.current,
        stats::average_band(stats.current),
        stats.min,
        stats.max,
        stats.total
    );
}

pub fn build_report(units: &[TeachingUnit], generated_on: NaiveDate) -> String {
    let overall = stats::overall_stats(units);
    let summaries = summarize_units(units);

    let mut output = String::new();

    let _ = writeln!(output, "# Grade Outlook Report");
    let _ = writeln!(output, "Generated on {generated_on}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall Average");

    if summaries.is_empty() {
        let _ = writeln!(output, "No teaching units recorded yet.");
        return output;
    }

    write_stats(&mut output, "All units", &overall);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Units by Risk");

    for summary in summaries.iter() {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "### {} (coefficient {})",
            summary.unit.name, summary.unit.coefficient
        );
        let _ = writeln!(
            output,
            "Risk {} / 100, {}: {}",
            summary.risk.score,
            summary.risk.level.as_str(),
            summary.risk.message
        );
        write_stats(&mut output, "Unit", &summary.stats);

        for subject in summary.unit.subjects.iter() {
            let label = format!("{} (coefficient {})", subject.name, subject.coefficient);
            write_stats(&mut output, &label, &stats::subject_stats(subject));
        }

        let direct = summary.unit.direct_grades();
        if !direct.is_empty() {
            let _ = writeln!(output, "- Direct grades:");
            for grade in direct {
                let _ = writeln!(
                    output,
                    "  - {} {} x{}{}",
                    grade.name,
                    grade.value,
                    grade.coefficient,
                    if grade.is_confirmed { " (confirmed)" } else { "" }
                );
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_units;

    #[test]
    fn riskiest_units_come_first() {
        let units = seed_units();
        let order: Vec<&str> = summarize_units(&units)
            .iter()
            .map(|summary| summary.unit.name.as_str())
            .collect();
        assert_eq!(order, vec!["Languages", "Economics", "Mathematics"]);
    }

    #[test]
    fn report_lists_units_and_subjects() {
        let units = seed_units();
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let report = build_report(&units, date);

        assert!(report.starts_with("# Grade Outlook Report\nGenerated on 2026-02-01"));
        assert!(report.contains("### Mathematics (coefficient 6)"));
        assert!(report.contains("Risk 10 / 100, low: stable situation"));
        assert!(report.contains("- Spanish (coefficient 1): no grades yet"));
        assert!(report.contains("  - Oral 10.5/20 x1"));
    }

    #[test]
    fn empty_report_says_so() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let report = build_report(&[], date);
        assert!(report.contains("No teaching units recorded yet."));
    }
}

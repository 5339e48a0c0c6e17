use crate::models::{GradeStats, RiskLevel, RiskScore, TeachingUnit};

pub const PASSING_AVERAGE: f64 = 10.0;
pub const MAX_SCORE: u32 = 100;
pub const NO_DATA_SCORE: u8 = 50;

pub fn risk_score(unit: &TeachingUnit, stats: &GradeStats) -> RiskScore {
    let (count, confirmed) = unit.all_grades().fold((0usize, 0usize), |(count, confirmed), grade| {
        (count + 1, confirmed + usize::from(grade.is_confirmed))
    });

    if count == 0 {
        return RiskScore {
            score: NO_DATA_SCORE,
            level: RiskLevel::Medium,
            message: "no data",
        };
    }

    let confirmed_pct = 100.0 * confirmed as f64 / count as f64;
    let raw = average_factor(stats.current)
        + confidence_factor(confirmed_pct)
        + sample_size_factor(stats.current, count);
    let score = raw.min(MAX_SCORE) as u8;

    let (level, message) = classify(score);
    let (level, message) = if stats.min >= PASSING_AVERAGE {
        guaranteed_pass(level, message)
    } else {
        (level, message)
    };

    RiskScore {
        score,
        level,
        message,
    }
}

/// Dominant signal: distance of the expected average from the passing mark.
pub fn average_factor(current: f64) -> u32 {
    match current {
        a if a >= 14.0 => 0,
        a if a >= 12.0 => 10,
        a if a >= PASSING_AVERAGE => 25,
        a if a >= 8.0 => 50,
        _ => 70,
    }
}

pub fn confidence_factor(confirmed_pct: f64) -> u32 {
    match confirmed_pct {
        p if p >= 80.0 => 0,
        p if p >= 50.0 => 10,
        p if p >= 20.0 => 20,
        _ => 30,
    }
}

/// Only weighs in on borderline averages, where a handful of marks can flip the outcome.
pub fn sample_size_factor(current: f64, assessments: usize) -> u32 {
    if !(PASSING_AVERAGE..12.0).contains(&current) {
        return 0;
    }
    match assessments {
        0 => 0,
        1 => 20,
        2 => 10,
        3..=4 => 5,
        _ => 0,
    }
}

pub fn classify(score: u8) -> (RiskLevel, &'static str) {
    match score {
        0..=25 => (RiskLevel::Low, "stable situation"),
        26..=50 => (RiskLevel::Medium, "attention required"),
        _ => (RiskLevel::High, "elevated risk"),
    }
}

fn guaranteed_pass(level: RiskLevel, message: &'static str) -> (RiskLevel, &'static str) {
    match level {
        RiskLevel::High => (RiskLevel::Medium, "passes even worst case"),
        RiskLevel::Medium => (RiskLevel::Low, "guaranteed pass"),
        RiskLevel::Low => (level, message),
    }
}

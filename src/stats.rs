use crate::models::{Grade, GradeStats, Subject, TeachingUnit};

#[derive(Debug, Default)]
struct WeightedPool {
    current: f64,
    min: f64,
    max: f64,
    total: f64,
}

impl WeightedPool {
    fn add_grade(&mut self, grade: &Grade) {
        self.total += grade.coefficient;
        self.current += grade.value.expected() * grade.coefficient;
        self.min += grade.value.worst() * grade.coefficient;
        self.max += grade.value.best() * grade.coefficient;
    }

    /// Empty contributors are absent from the pool, not counted as zero.
    fn add_stats(&mut self, stats: GradeStats, coefficient: f64) {
        if !stats.has_data() {
            return;
        }
        self.total += coefficient;
        self.current += stats.current * coefficient;
        self.min += stats.min * coefficient;
        self.max += stats.max * coefficient;
    }

    fn finish(self) -> GradeStats {
        if self.total > 0.0 {
            GradeStats {
                current: self.current / self.total,
                min: self.min / self.total,
                max: self.max / self.total,
                total: self.total,
            }
        } else {
            GradeStats {
                total: self.total,
                ..GradeStats::default()
            }
        }
    }
}

pub fn subject_stats(subject: &Subject) -> GradeStats {
    let mut pool = WeightedPool::default();
    for grade in &subject.grades {
        pool.add_grade(grade);
    }
    pool.finish()
}

/// Subject averages and direct unit grades share one weighted pool.
pub fn unit_stats(unit: &TeachingUnit) -> GradeStats {
    let mut pool = WeightedPool::default();
    for subject in &unit.subjects {
        pool.add_stats(subject_stats(subject), subject.coefficient);
    }
    for grade in unit.direct_grades() {
        pool.add_grade(grade);
    }
    pool.finish()
}

pub fn overall_stats(units: &[TeachingUnit]) -> GradeStats {
    let mut pool = WeightedPool::default();
    for unit in units {
        pool.add_stats(unit_stats(unit), unit.coefficient);
    }
    pool.finish()
}

pub fn average_band(average: f64) -> &'static str {
    match average {
        a if a >= 16.0 => "excellent",
        a if a >= 14.0 => "good",
        a if a >= 12.0 => "fair",
        a if a >= 10.0 => "passing",
        _ => "failing",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GradeValue;
    use proptest::prelude::*;

    fn exact(value: f64, coefficient: f64) -> Grade {
        Grade {
            id: format!("g-{value}-{coefficient}"),
            name: "Quiz".to_string(),
            value: GradeValue::Exact { value },
            coefficient,
            is_confirmed: false,
            date: None,
        }
    }

    fn range(min: f64, max: f64, coefficient: f64) -> Grade {
        Grade {
            value: GradeValue::Range { min, max },
            ..exact(0.0, coefficient)
        }
    }

    fn subject(coefficient: f64, grades: Vec<Grade>) -> Subject {
        Subject {
            id: format!("s-{}", grades.len()),
            name: "Physics".to_string(),
            coefficient,
            color: "#22c55e".to_string(),
            grades,
        }
    }

    fn unit(coefficient: f64, subjects: Vec<Subject>, grades: Option<Vec<Grade>>) -> TeachingUnit {
        TeachingUnit {
            id: "u1".to_string(),
            name: "Sciences".to_string(),
            coefficient,
            color: "#22c55e".to_string(),
            subjects,
            grades,
        }
    }

    #[test]
    fn empty_subject_has_no_data() {
        assert_eq!(subject_stats(&subject(3.0, vec![])), GradeStats::default());
    }

    #[test]
    fn range_contributes_midpoint_and_bounds() {
        let stats = subject_stats(&subject(1.0, vec![range(8.0, 16.0, 2.0)]));
        assert_eq!(
            stats,
            GradeStats {
                current: 12.0,
                min: 8.0,
                max: 16.0,
                total: 2.0
            }
        );
    }

    #[test]
    fn subject_average_is_weighted() {
        let stats = subject_stats(&subject(1.0, vec![exact(10.0, 1.0), exact(16.0, 2.0)]));
        assert!((stats.current - 14.0).abs() < 1e-9);
        assert_eq!(stats.total, 3.0);
    }

    #[test]
    fn empty_subject_does_not_dilute_unit() {
        let stats = unit_stats(&unit(
            1.0,
            vec![subject(5.0, vec![]), subject(1.0, vec![exact(12.0, 1.0)])],
            None,
        ));
        assert_eq!(stats.current, 12.0);
        assert_eq!(stats.total, 1.0);
    }

    #[test]
    fn direct_grades_are_peers_of_subjects() {
        let stats = unit_stats(&unit(
            1.0,
            vec![subject(1.0, vec![exact(16.0, 1.0)])],
            Some(vec![exact(8.0, 1.0)]),
        ));
        assert_eq!(stats.current, 12.0);
        assert_eq!(stats.total, 2.0);
    }

    #[test]
    fn unit_with_only_direct_grades() {
        let stats = unit_stats(&unit(1.0, vec![], Some(vec![range(6.0, 14.0, 1.0)])));
        assert_eq!(stats.current, 10.0);
        assert_eq!(stats.min, 6.0);
        assert_eq!(stats.max, 14.0);
    }

    #[test]
    fn overall_skips_units_without_data() {
        let units = vec![
            unit(4.0, vec![subject(1.0, vec![])], None),
            unit(2.0, vec![subject(1.0, vec![exact(15.0, 1.0)])], None),
            unit(1.0, vec![], Some(vec![exact(9.0, 1.0)])),
        ];
        let stats = overall_stats(&units);
        assert!((stats.current - 13.0).abs() < 1e-9);
        assert_eq!(stats.total, 3.0);
    }

    #[test]
    fn overall_of_nothing_is_zero() {
        assert_eq!(overall_stats(&[]), GradeStats::default());
    }

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(average_band(17.0), "excellent");
        assert_eq!(average_band(14.0), "good");
        assert_eq!(average_band(12.5), "fair");
        assert_eq!(average_band(10.0), "passing");
        assert_eq!(average_band(9.99), "failing");
    }

    proptest! {
        #[test]
        fn single_exact_grade_is_its_own_average(v in 0.0..=20.0f64, c in 0.25..10.0f64) {
            let stats = subject_stats(&subject(1.0, vec![exact(v, c)]));
            prop_assert!((stats.current - v).abs() < 1e-9);
            prop_assert!((stats.min - v).abs() < 1e-9);
            prop_assert!((stats.max - v).abs() < 1e-9);
            prop_assert_eq!(stats.total, c);
        }

        #[test]
        fn worst_never_exceeds_best(
            grades in proptest::collection::vec((0.0..=20.0f64, 0.0..=10.0f64, 0.25..5.0f64), 1..12)
        ) {
            let grades = grades
                .into_iter()
                .map(|(lo, spread, c)| range(lo, lo + spread, c))
                .collect();
            let stats = unit_stats(&unit(1.0, vec![subject(2.0, grades)], None));
            prop_assert!(stats.min <= stats.current + 1e-9);
            prop_assert!(stats.current <= stats.max + 1e-9);
        }
    }
}

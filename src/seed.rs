use chrono::NaiveDate;

use crate::gradebook::Gradebook;
use crate::models::{new_id, Grade, GradeValue, Subject, TeachingUnit};

fn grade(
    name: &str,
    value: GradeValue,
    coefficient: f64,
    confirmed: bool,
    date: Option<NaiveDate>,
) -> Grade {
    Grade {
        id: new_id(),
        name: name.to_string(),
        value,
        coefficient,
        is_confirmed: confirmed,
        date,
    }
}

fn subject(name: &str, coefficient: f64, color: &str, grades: Vec<Grade>) -> Subject {
    Subject {
        id: new_id(),
        name: name.to_string(),
        coefficient,
        color: color.to_string(),
        grades,
    }
}

/// A realistic semester: one comfortable unit, one borderline, one in trouble.
pub fn seed_units() -> Vec<TeachingUnit> {
    let exact = |value| GradeValue::Exact { value };
    let range = |min, max| GradeValue::Range { min, max };
    let date = NaiveDate::from_ymd_opt;

    vec![
        TeachingUnit {
            id: new_id(),
            name: "Mathematics".to_string(),
            coefficient: 6.0,
            color: "#3b82f6".to_string(),
            subjects: vec![
                subject(
                    "Linear Algebra",
                    3.0,
                    "#3b82f6",
                    vec![
                        grade("Midterm", exact(15.5), 2.0, true, date(2026, 1, 14)),
                        grade("Homework", exact(17.0), 1.0, true, None),
                    ],
                ),
                subject(
                    "Probability",
                    3.0,
                    "#6366f1",
                    vec![grade("Final", range(12.0, 16.0), 3.0, false, date(2026, 1, 28))],
                ),
            ],
            grades: None,
        },
        TeachingUnit {
            id: new_id(),
            name: "Economics".to_string(),
            coefficient: 4.0,
            color: "#f97316".to_string(),
            subjects: vec![subject(
                "Microeconomics",
                2.0,
                "#f97316",
                vec![grade("Case study", range(9.0, 13.0), 1.0, false, None)],
            )],
            grades: Some(vec![grade("Oral", exact(10.5), 1.0, false, None)]),
        },
        TeachingUnit {
            id: new_id(),
            name: "Languages".to_string(),
            coefficient: 2.0,
            color: "#22c55e".to_string(),
            subjects: vec![
                subject(
                    "English",
                    1.0,
                    "#22c55e",
                    vec![grade("Essay", exact(7.5), 1.0, true, None)],
                ),
                subject("Spanish", 1.0, "#14b8a6", Vec::new()),
            ],
            grades: None,
        },
    ]
}

/// Adds the sample units whose names are not in the book yet, so seeding
/// twice leaves a single copy. Returns the book and how many units were added.
pub fn merge_seed(book: Gradebook) -> (Gradebook, usize) {
    seed_units()
        .into_iter()
        .fold((book, 0), |(book, added), unit| {
            if book.resolve_unit(&unit.name).is_some() {
                (book, added)
            } else {
                (book.add_unit(unit), added + 1)
            }
        })
}

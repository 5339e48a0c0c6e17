use std::io::Read;

use anyhow::Context;
use chrono::NaiveDate;
use tracing::debug;

use crate::gradebook::{GradeTarget, Gradebook};
use crate::validation::{build_grade, build_subject, build_unit, GradeInput, NumericPolicy};

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    unit: String,
    subject: Option<String>,
    grade: String,
    value: Option<String>,
    min: Option<String>,
    max: Option<String>,
    coefficient: Option<String>,
    confirmed: Option<bool>,
    date: Option<NaiveDate>,
}

pub fn import_csv(
    book: Gradebook,
    csv_path: &std::path::Path,
    policy: NumericPolicy,
) -> anyhow::Result<(Gradebook, usize)> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    import_reader(book, file, policy)
}

/// Applies every row or none: the first bad row aborts with its line number.
pub fn import_reader<R: Read>(
    mut book: Gradebook,
    source: R,
    policy: NumericPolicy,
) -> anyhow::Result<(Gradebook, usize)> {
    let mut reader = csv::Reader::from_reader(source);
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("line {line}: malformed row"))?;
        book = apply_row(book, &row, policy).with_context(|| format!("line {line}"))?;
        inserted += 1;
    }

    debug!(inserted, "csv rows applied");
    Ok((book, inserted))
}

fn apply_row(
    mut book: Gradebook,
    row: &CsvRow,
    policy: NumericPolicy,
) -> anyhow::Result<Gradebook> {
    let grade = build_grade(
        &GradeInput {
            name: &row.grade,
            exact: row.value.as_deref(),
            min: row.min.as_deref(),
            max: row.max.as_deref(),
            coefficient: row.coefficient.as_deref(),
            confirmed: row.confirmed.unwrap_or(false),
            date: row.date,
        },
        policy,
    )?;

    let existing = book.resolve_unit(&row.unit).map(|unit| unit.id.clone());
    let unit_id = match existing {
        Some(id) => id,
        None => {
            let unit = build_unit(&row.unit, None, None, policy)?;
            let id = unit.id.clone();
            book = book.add_unit(unit);
            id
        }
    };

    let Some(subject_name) = row.subject.as_deref() else {
        return Ok(book.add_grade(GradeTarget::Unit(&unit_id), grade)?);
    };

    let existing = book
        .unit(&unit_id)
        .and_then(|unit| unit.resolve_subject(subject_name))
        .map(|subject| subject.id.clone());
    let subject_id = match existing {
        Some(id) => id,
        None => {
            let subject = build_subject(subject_name, None, None, policy)?;
            let id = subject.id.clone();
            book = book.add_subject(&unit_id, subject)?;
            id
        }
    };

    Ok(book.add_grade(
        GradeTarget::Subject {
            unit_id: &unit_id,
            subject_id: &subject_id,
        },
        grade,
    )?)
}

use crate::error::GradebookError;
use crate::models::{Grade, GradeStats, Subject, TeachingUnit};
use crate::stats;

/// Where a new grade is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeTarget<'a> {
    Unit(&'a str),
    Subject { unit_id: &'a str, subject_id: &'a str },
}

/// Ordered sequence of teaching units. Every edit consumes the book and
/// returns the next version; nothing is mutated behind a shared reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gradebook {
    units: Vec<TeachingUnit>,
}

type EditResult = Result<Gradebook, GradebookError>;

impl Gradebook {
    pub fn new(units: Vec<TeachingUnit>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[TeachingUnit] {
        &self.units
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn overall_stats(&self) -> GradeStats {
        stats::overall_stats(&self.units)
    }

    pub fn unit(&self, id: &str) -> Option<&TeachingUnit> {
        self.units.iter().find(|unit| unit.id == id)
    }

    /// Looks a unit up by id, falling back to a case-insensitive name match.
    pub fn resolve_unit(&self, key: &str) -> Option<&TeachingUnit> {
        self.unit(key).or_else(|| {
            self.units
                .iter()
                .find(|unit| unit.name.eq_ignore_ascii_case(key.trim()))
        })
    }

    pub fn find_grade(&self, id: &str) -> Option<&Grade> {
        self.units
            .iter()
            .flat_map(|unit| unit.all_grades())
            .find(|grade| grade.id == id)
    }

    pub fn add_unit(mut self, unit: TeachingUnit) -> Self {
        self.units.push(unit);
        self
    }

    pub fn update_unit(self, updated: TeachingUnit) -> EditResult {
        let id = updated.id.clone();
        self.map_unit(&id, |_| updated)
    }

    /// Removes the unit together with its subjects and grades.
    pub fn delete_unit(mut self, id: &str) -> EditResult {
        let before = self.units.len();
        self.units.retain(|unit| unit.id != id);
        if self.units.len() == before {
            return Err(GradebookError::not_found("unit", id));
        }
        Ok(self)
    }

    pub fn add_subject(self, unit_id: &str, subject: Subject) -> EditResult {
        self.map_unit(unit_id, |mut unit| {
            unit.subjects.push(subject);
            unit
        })
    }

    pub fn update_subject(self, unit_id: &str, updated: Subject) -> EditResult {
        let mut found = false;
        let book = self.map_unit(unit_id, |mut unit| {
            unit.subjects =
                replace_by_id(unit.subjects, &updated.id, |_| updated.clone(), &mut found);
            unit
        })?;
        found
            .then_some(book)
            .ok_or_else(|| GradebookError::not_found("subject", &updated.id))
    }

    pub fn delete_subject(self, unit_id: &str, subject_id: &str) -> EditResult {
        let mut found = false;
        let book = self.map_unit(unit_id, |mut unit| {
            let before = unit.subjects.len();
            unit.subjects.retain(|subject| subject.id != subject_id);
            found = unit.subjects.len() != before;
            unit
        })?;
        found
            .then_some(book)
            .ok_or_else(|| GradebookError::not_found("subject", subject_id))
    }

    pub fn add_grade(self, target: GradeTarget<'_>, grade: Grade) -> EditResult {
        match target {
            GradeTarget::Unit(unit_id) => self.map_unit(unit_id, |mut unit| {
                unit.grades.get_or_insert_with(Vec::new).push(grade);
                unit
            }),
            GradeTarget::Subject {
                unit_id,
                subject_id,
            } => {
                let mut found = false;
                let book = self.map_unit(unit_id, |mut unit| {
                    unit.subjects = replace_by_id(
                        unit.subjects,
                        subject_id,
                        |mut subject| {
                            subject.grades.push(grade);
                            subject
                        },
                        &mut found,
                    );
                    unit
                })?;
                found
                    .then_some(book)
                    .ok_or_else(|| GradebookError::not_found("subject", subject_id))
            }
        }
    }

    /// Replaces the grade with the same id wherever it lives in the tree.
    pub fn update_grade(self, updated: Grade) -> EditResult {
        let id = updated.id.clone();
        self.map_grade(&id, |_| updated.clone())
    }

    pub fn set_confirmed(self, grade_id: &str, confirmed: bool) -> EditResult {
        self.map_grade(grade_id, |mut grade| {
            grade.is_confirmed = confirmed;
            grade
        })
    }

    pub fn delete_grade(mut self, grade_id: &str) -> EditResult {
        let mut found = false;
        for unit in &mut self.units {
            for subject in &mut unit.subjects {
                found |= retain_except(&mut subject.grades, grade_id);
            }
            if let Some(grades) = unit.grades.as_mut() {
                found |= retain_except(grades, grade_id);
            }
        }
        if !found {
            return Err(GradebookError::not_found("grade", grade_id));
        }
        Ok(self)
    }

    fn map_unit(mut self, id: &str, f: impl FnOnce(TeachingUnit) -> TeachingUnit) -> EditResult {
        let mut found = false;
        self.units = replace_by_id(self.units, id, f, &mut found);
        if !found {
            return Err(GradebookError::not_found("unit", id));
        }
        Ok(self)
    }

    fn map_grade(mut self, id: &str, f: impl Fn(Grade) -> Grade) -> EditResult {
        let mut found = false;
        self.units = self
            .units
            .into_iter()
            .map(|mut unit| {
                unit.subjects = unit
                    .subjects
                    .into_iter()
                    .map(|mut subject| {
                        subject.grades = replace_by_id(subject.grades, id, &f, &mut found);
                        subject
                    })
                    .collect();
                unit.grades = unit
                    .grades
                    .map(|grades| replace_by_id(grades, id, &f, &mut found));
                unit
            })
            .collect();
        if !found {
            return Err(GradebookError::not_found("grade", id));
        }
        Ok(self)
    }
}

trait Identified {
    fn id(&self) -> &str;
}

impl Identified for TeachingUnit {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Subject {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Grade {
    fn id(&self) -> &str {
        &self.id
    }
}

fn replace_by_id<T: Identified>(
    items: Vec<T>,
    id: &str,
    f: impl FnOnce(T) -> T,
    found: &mut bool,
) -> Vec<T> {
    let mut f = Some(f);
    items
        .into_iter()
        .map(|item| {
            if item.id() != id {
                return item;
            }
            match f.take() {
                Some(f) => {
                    *found = true;
                    f(item)
                }
                None => item,
            }
        })
        .collect()
}

fn retain_except(grades: &mut Vec<Grade>, id: &str) -> bool {
    let before = grades.len();
    grades.retain(|grade| grade.id != id);
    grades.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GradeValue;

    fn grade(id: &str, value: f64) -> Grade {
        Grade {
            id: id.to_string(),
            name: format!("grade {id}"),
            value: GradeValue::Exact { value },
            coefficient: 1.0,
            is_confirmed: false,
            date: None,
        }
    }

    fn subject(id: &str) -> Subject {
        Subject {
            id: id.to_string(),
            name: format!("subject {id}"),
            coefficient: 1.0,
            color: "#a855f7".to_string(),
            grades: Vec::new(),
        }
    }

    fn unit(id: &str) -> TeachingUnit {
        TeachingUnit {
            id: id.to_string(),
            name: format!("Unit {id}"),
            coefficient: 1.0,
            color: "#a855f7".to_string(),
            subjects: Vec::new(),
            grades: None,
        }
    }

    fn sample_book() -> Gradebook {
        Gradebook::default()
            .add_unit(unit("u1"))
            .add_unit(unit("u2"))
            .add_subject("u1", subject("s1"))
            .and_then(|book| {
                book.add_grade(
                    GradeTarget::Subject {
                        unit_id: "u1",
                        subject_id: "s1",
                    },
                    grade("g1", 12.0),
                )
            })
            .and_then(|book| book.add_grade(GradeTarget::Unit("u2"), grade("g2", 8.0)))
            .unwrap()
    }

    #[test]
    fn grades_land_where_targeted() {
        let book = sample_book();
        assert_eq!(book.unit("u1").unwrap().subjects[0].grades[0].id, "g1");
        assert_eq!(book.unit("u2").unwrap().direct_grades()[0].id, "g2");
        assert_eq!(book.overall_stats().current, 10.0);
    }

    #[test]
    fn edits_leave_previous_version_untouched() {
        let before = sample_book();
        let after = before.clone().set_confirmed("g2", true).unwrap();
        assert!(!before.find_grade("g2").unwrap().is_confirmed);
        assert!(after.find_grade("g2").unwrap().is_confirmed);
    }

    #[test]
    fn update_grade_replaces_in_place() {
        let book = sample_book()
            .update_grade(Grade {
                value: GradeValue::Range { min: 10.0, max: 14.0 },
                ..grade("g1", 0.0)
            })
            .unwrap();
        let updated = book.find_grade("g1").unwrap();
        assert_eq!(updated.value, GradeValue::Range { min: 10.0, max: 14.0 });
        assert_eq!(book.unit("u1").unwrap().subjects[0].grades.len(), 1);
    }

    #[test]
    fn deletes_cascade_to_children() {
        let book = sample_book().delete_subject("u1", "s1").unwrap();
        assert!(book.find_grade("g1").is_none());

        let book = book.delete_unit("u2").unwrap();
        assert!(book.find_grade("g2").is_none());
        assert_eq!(book.units().len(), 1);
    }

    #[test]
    fn delete_grade_searches_subjects_and_units() {
        let book = sample_book().delete_grade("g1").unwrap().delete_grade("g2").unwrap();
        assert_eq!(book.overall_stats(), GradeStats::default());
    }

    #[test]
    fn unknown_ids_are_reported() {
        assert_eq!(
            sample_book().delete_unit("nope").unwrap_err(),
            GradebookError::not_found("unit", "nope")
        );
        assert_eq!(
            sample_book().add_subject("nope", subject("s9")).unwrap_err(),
            GradebookError::not_found("unit", "nope")
        );
        assert_eq!(
            sample_book()
                .add_grade(
                    GradeTarget::Subject {
                        unit_id: "u1",
                        subject_id: "missing"
                    },
                    grade("g3", 10.0)
                )
                .unwrap_err(),
            GradebookError::not_found("subject", "missing")
        );
        assert_eq!(
            sample_book().set_confirmed("g9", true).unwrap_err(),
            GradebookError::not_found("grade", "g9")
        );
        assert_eq!(
            sample_book().update_subject("u2", subject("s1")).unwrap_err(),
            GradebookError::not_found("subject", "s1")
        );
    }

    #[test]
    fn units_resolve_by_id_or_name() {
        let book = sample_book();
        assert_eq!(book.resolve_unit("u2").unwrap().id, "u2");
        assert_eq!(book.resolve_unit("unit U1").unwrap().id, "u1");
        assert!(book.resolve_unit("Unit u3").is_none());
    }
}

//! The student record passed between nodes.
//!
//! Different nodes know different parts of a student: basic info, exercise
//! points, exam points, project grade. Partial records with the same `id`
//! are merged field by field until a node has enough to grade.

use serde::{Deserialize, Serialize};

use pfn_protocol::{DataItem, ProtocolError};

pub const BASIC_INFO: &str = "studentbasicinfo";
pub const EXERCISE_INFO: &str = "exerciseinfo";
pub const EXAM_INFO: &str = "examinfo";
pub const PROJECT_INFO: &str = "projectinfo";

/// Grades run from 0 (fail) to 5.
pub const MAX_GRADE: u8 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDataItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_grade: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<u8>,
}

impl StudentDataItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_study_program(mut self, program: impl Into<String>) -> Self {
        self.study_program = Some(program.into());
        self
    }

    pub fn with_exercise_points(mut self, points: u32) -> Self {
        self.exercise_points = Some(points);
        self
    }

    pub fn with_exam_points(mut self, points: u32) -> Self {
        self.exam_points = Some(points);
        self
    }

    pub fn with_project_grade(mut self, grade: u8) -> Self {
        self.project_grade = Some(grade);
        self
    }

    /// Name for messages; falls back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

fn invalid(raw: &str) -> ProtocolError {
    ProtocolError::InvalidRecord(raw.to_string())
}

fn number<N: std::str::FromStr>(raw: &str, field: Option<&str>) -> Result<N, ProtocolError> {
    field
        .map(str::trim)
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| invalid(raw))
}

impl DataItem for StudentDataItem {
    /// Tab separated, id first:
    ///
    /// - `studentbasicinfo`: id, name, study program
    /// - `exerciseinfo`: id, then points per exercise (summed)
    /// - `examinfo`: id, exam points
    /// - `projectinfo`: id, project grade 0-5
    fn parse_line(raw: &str, content_type: &str) -> Result<Self, ProtocolError> {
        let mut fields = raw.split('\t');
        let id = fields
            .next()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| invalid(raw))?;
        let mut student = StudentDataItem::new(id);

        match content_type.trim() {
            BASIC_INFO => {
                let name = fields.next().map(str::trim).filter(|s| !s.is_empty());
                student.name = Some(name.ok_or_else(|| invalid(raw))?.to_string());
                student.study_program = fields
                    .next()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
            }
            EXERCISE_INFO => {
                let mut total = 0u32;
                for field in fields.filter(|f| !f.trim().is_empty()) {
                    total = total
                        .checked_add(number::<u32>(raw, Some(field))?)
                        .ok_or_else(|| invalid(raw))?;
                }
                student.exercise_points = Some(total);
            }
            EXAM_INFO => student.exam_points = Some(number(raw, fields.next())?),
            PROJECT_INFO => {
                let grade: u8 = number(raw, fields.next())?;
                if grade > MAX_GRADE {
                    return Err(invalid(raw));
                }
                student.project_grade = Some(grade);
            }
            other => {
                return Err(ProtocolError::InvalidRecord(format!(
                    "unknown content type {other:?}"
                )))
            }
        }
        Ok(student)
    }

    fn from_wire(body: &str) -> Result<Self, ProtocolError> {
        let student: StudentDataItem = serde_json::from_str(body)?;
        let out_of_range = |grade: Option<u8>| grade.is_some_and(|g| g > MAX_GRADE);
        if out_of_range(student.project_grade) || out_of_range(student.grade) {
            return Err(invalid(body));
        }
        Ok(student)
    }

    fn to_wire_body(&self) -> String {
        // A struct of strings and integers always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    fn identity(&self) -> &str {
        &self.id
    }

    fn merge_from(&mut self, other: &Self) {
        fn take<V: Clone>(into: &mut Option<V>, from: &Option<V>) {
            if from.is_some() {
                into.clone_from(from);
            }
        }
        take(&mut self.name, &other.name);
        take(&mut self.study_program, &other.study_program);
        take(&mut self.exercise_points, &other.exercise_points);
        take(&mut self.exam_points, &other.exam_points);
        take(&mut self.project_grade, &other.project_grade);
        take(&mut self.grade, &other.grade);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_content_type() {
        let basic = StudentDataItem::parse_line("S1\tAlice\tCS", BASIC_INFO).unwrap();
        assert_eq!(basic.name.as_deref(), Some("Alice"));
        assert_eq!(basic.study_program.as_deref(), Some("CS"));

        let ex = StudentDataItem::parse_line("S1\t5\t10\t\t3", EXERCISE_INFO).unwrap();
        assert_eq!(ex.exercise_points, Some(18));

        let exam = StudentDataItem::parse_line("S1\t27", EXAM_INFO).unwrap();
        assert_eq!(exam.exam_points, Some(27));

        let project = StudentDataItem::parse_line("S1\t4", PROJECT_INFO).unwrap();
        assert_eq!(project.project_grade, Some(4));
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(StudentDataItem::parse_line("\tAlice", BASIC_INFO).is_err());
        assert!(StudentDataItem::parse_line("S1", BASIC_INFO).is_err());
        assert!(StudentDataItem::parse_line("S1\tmany", EXAM_INFO).is_err());
        assert!(StudentDataItem::parse_line("S1\t6", PROJECT_INFO).is_err());
        assert!(StudentDataItem::parse_line("S1\t1", "grades").is_err());
        assert!(StudentDataItem::parse_line("S1\t4294967295\t1", EXERCISE_INFO).is_err());
    }

    #[test]
    fn wire_records_with_impossible_grades_are_rejected() {
        for body in [
            r#"{"id":"S1","exam_points":30,"project_grade":255}"#,
            r#"{"id":"S1","grade":6}"#,
        ] {
            assert!(matches!(
                StudentDataItem::from_wire(body),
                Err(ProtocolError::InvalidRecord(_))
            ));
        }
        let ok = StudentDataItem::from_wire(r#"{"id":"S1","project_grade":5}"#).unwrap();
        assert_eq!(ok.project_grade, Some(MAX_GRADE));
    }

    #[test]
    fn merge_only_overwrites_present_fields() {
        let mut student = StudentDataItem::new("S1")
            .with_name("Alice")
            .with_exam_points(10);
        student.merge_from(&StudentDataItem::new("S1").with_exam_points(20).with_study_program("CS"));
        assert_eq!(student.name.as_deref(), Some("Alice"));
        assert_eq!(student.study_program.as_deref(), Some("CS"));
        assert_eq!(student.exam_points, Some(20));
    }

    #[test]
    fn wire_form_omits_unknown_fields() {
        let s = StudentDataItem::new("S1").with_name("Alice");
        assert_eq!(s.to_wire_body(), r#"{"id":"S1","name":"Alice"}"#);
        assert_eq!(StudentDataItem::from_wire(&s.to_wire_body()).unwrap(), s);
    }
}

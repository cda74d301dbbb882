//! Grade calculation.
//!
//! Exam points are out of [`MAX_EXAM_POINTS`] and converted to a 0-5 scale
//! before combining with the project grade.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{StudentDataItem, StudentError, MAX_GRADE};

pub const MAX_EXAM_POINTS: u32 = 30;
/// Exercise points that earn the usual grader's bonus.
pub const EXERCISE_BONUS_POINTS: u32 = 40;

pub trait GradeCalculator: Send + Sync {
    fn name(&self) -> &str;

    /// The grade, or `None` while exam points or the project grade are
    /// still missing.
    fn calculate(&self, student: &StudentDataItem) -> Option<u8>;
}

fn exam_grade(points: u32) -> u8 {
    match points.min(MAX_EXAM_POINTS) {
        0..=9 => 0,
        10..=13 => 1,
        14..=17 => 2,
        18..=21 => 3,
        22..=25 => 4,
        _ => 5,
    }
}

/// Averages exam and project, rounding up, with one bonus grade for
/// enough exercise points. A failed exam fails the course.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsualGrader;

impl GradeCalculator for UsualGrader {
    fn name(&self) -> &str {
        "usual"
    }

    fn calculate(&self, student: &StudentDataItem) -> Option<u8> {
        let exam = exam_grade(student.exam_points?);
        let project = student.project_grade?.min(MAX_GRADE);
        if exam == 0 {
            return Some(0);
        }
        let bonus = u8::from(student.exercise_points.unwrap_or(0) >= EXERCISE_BONUS_POINTS);
        Some(((exam + project).div_ceil(2) + bonus).min(MAX_GRADE))
    }
}

/// The weaker of exam and project; exercises do not count.
#[derive(Debug, Clone, Copy, Default)]
pub struct CruelGrader;

impl GradeCalculator for CruelGrader {
    fn name(&self) -> &str {
        "cruel"
    }

    fn calculate(&self, student: &StudentDataItem) -> Option<u8> {
        let exam = exam_grade(student.exam_points?);
        Some(exam.min(student.project_grade?).min(MAX_GRADE))
    }
}

pub struct GraderFactory;

impl GraderFactory {
    /// Pick a grader at random.
    pub fn make_grader() -> Box<dyn GradeCalculator> {
        Self::pick(&mut StdRng::from_entropy())
    }

    /// Deterministic pick for reproducible runs.
    pub fn make_grader_seeded(seed: u64) -> Box<dyn GradeCalculator> {
        Self::pick(&mut StdRng::seed_from_u64(seed))
    }

    pub fn by_name(name: &str) -> Result<Box<dyn GradeCalculator>, StudentError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "usual" => Ok(Box::new(UsualGrader)),
            "cruel" => Ok(Box::new(CruelGrader)),
            other => Err(StudentError::UnknownGrader(other.to_string())),
        }
    }

    fn pick(rng: &mut impl Rng) -> Box<dyn GradeCalculator> {
        let grader: Box<dyn GradeCalculator> = if rng.gen_bool(0.5) {
            Box::new(UsualGrader)
        } else {
            Box::new(CruelGrader)
        };
        tracing::info!(grader = grader.name(), "Created grader");
        grader
    }
}

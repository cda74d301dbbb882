use pfn_node::DataHandler;
use pfn_protocol::Package;

use crate::{GradeCalculator, GraderFactory, StudentDataItem};

const TAG: &str = "GradingHandler";

/// Grades every student whose record is complete enough. Never consumes.
pub struct GradingHandler {
    calculator: Box<dyn GradeCalculator>,
}

impl GradingHandler {
    pub fn new(calculator: Box<dyn GradeCalculator>) -> Self {
        tracing::info!(handler = TAG, grader = calculator.name(), "Grader selected");
        Self { calculator }
    }

    /// Grade with whichever grader the factory picks.
    pub fn with_random_grader() -> Self {
        Self::new(GraderFactory::make_grader())
    }

    pub fn grader(&self) -> &str {
        self.calculator.name()
    }
}

impl DataHandler<StudentDataItem> for GradingHandler {
    fn name(&self) -> &str {
        TAG
    }

    fn consume(&self, package: &mut Package<StudentDataItem>) -> bool {
        if !package.is_data() {
            return false;
        }
        if let Some(student) = package.item_mut() {
            match self.calculator.calculate(student) {
                Some(grade) => {
                    tracing::info!(handler = TAG, id = %student.id, grade, "Graded student");
                    student.grade = Some(grade);
                }
                None => {
                    tracing::debug!(handler = TAG, id = %student.id, "Not enough data to grade");
                }
            }
        }
        false
    }
}

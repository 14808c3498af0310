use thiserror::Error;

/// Errors raised while loading and validating scheduling input.
///
/// All variants fail fast at the data boundary; once a
/// [`SchedulingDataSet`](crate::dataset::SchedulingDataSet) is built the
/// search itself never fails. Infeasibility (unseatable demand, residual
/// conflicts) is reported as data alongside the result instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("invalid input data: {0}")]
    DataValidation(String),
    #[error("course {course_id}: days_per_week must be between 1 and 6, got {days_per_week}")]
    InvalidCourseDefinition { course_id: String, days_per_week: i64 },
    #[error("unrecognized time format: {0:?}")]
    InvalidTimeFormat(String),
}

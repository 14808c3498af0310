use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SchedulerError;
use crate::ga::repair::ResidualConflict;

/// Room / session kind. Courses only fit rooms of their own kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomKind {
    Lecture,
    Lab,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomRecord {
    pub id: String,
    pub name: String,
    pub capacity: u32,
    #[serde(rename = "type")]
    pub kind: RoomKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseRecord {
    pub id: String,
    pub name: String,
    pub department: String,
    pub major: String,
    pub days_per_week: u32,
    pub hours_per_day: u32,
    pub instructor_id: String,
    pub year: u32,
    #[serde(rename = "type")]
    pub kind: RoomKind,
    #[serde(default)]
    pub duration: Option<String>,
}

/// One declared availability window of an instructor on one weekday.
/// Times are clock text in any of the forms `timeutil::parse_clock` accepts.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityRecord {
    pub instructor_id: String,
    pub instructor_name: String,
    pub department: String,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DivisionRecord {
    pub id: String,
    pub department: String,
    pub major: String,
    pub year: u32,
    pub student_count: u32,
}

/// The four input collections of one scheduling problem.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingData {
    pub rooms: Vec<RoomRecord>,
    pub courses: Vec<CourseRecord>,
    pub instructors: Vec<AvailabilityRecord>,
    pub divisions: Vec<DivisionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    pub population_size: usize,
    pub generations: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    /// Fixed RNG seed for reproducible runs; omitted means OS entropy.
    pub seed: Option<u64>,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            mutation_rate: 0.15,
            crossover_rate: 0.8,
            seed: None,
        }
    }
}

impl GaConfig {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if !(10..=500).contains(&self.population_size) {
            return Err(SchedulerError::DataValidation(format!(
                "population_size must be within [10, 500], got {}",
                self.population_size
            )));
        }
        if !(10..=1000).contains(&self.generations) {
            return Err(SchedulerError::DataValidation(format!(
                "generations must be within [10, 1000], got {}",
                self.generations
            )));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(SchedulerError::DataValidation(format!(
                "mutation_rate must be within [0, 1], got {}",
                self.mutation_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(SchedulerError::DataValidation(format!(
                "crossover_rate must be within [0, 1], got {}",
                self.crossover_rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub config: Option<GaConfig>,
    pub data: SchedulingData,
}

/// One exported session row, the unit of the output contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub day: String,
    pub course_name: String,
    pub instructor_name: String,
    pub offline_student_count: u32,
    pub total_student_count: u32,
    pub room_name: String,
    pub room_capacity: u32,
    pub group_label: String,
    pub start_time: String,
    pub end_time: String,
    pub department: String,
    pub major: String,
    pub year: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleResponse {
    pub success: bool,
    pub message: String,
    pub schedule: Vec<SessionRecord>,
    pub total_assignments: usize,
    pub fitness_score: f64,
    pub generations_run: usize,
    pub warnings: Vec<String>,
    pub residual_conflicts: Vec<ResidualConflict>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    pub sessions: Vec<SessionRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
}

/// Per-generation progress event streamed to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationProgress {
    pub generation: usize,
    pub elapsed_time: Duration,
    pub best_fitness: f64,
    pub is_finished: bool,
}

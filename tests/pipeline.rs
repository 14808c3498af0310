//! End-to-end pipeline: build the data set, evolve a schedule, repair it,
//! format it, and audit the exported records.

use ga_scheduler::checker::ScheduleChecker;
use ga_scheduler::dataset::SchedulingDataSet;
use ga_scheduler::ga::optimizer::GeneticOptimizer;
use ga_scheduler::ga::repair::repair_conflicts;
use ga_scheduler::ga::{format_schedule, individual::Assignment};
use ga_scheduler::models::{
    AvailabilityRecord, CourseRecord, DivisionRecord, GaConfig, RoomKind, RoomRecord,
    SchedulingData,
};
use hashbrown::HashMap;

fn room(id: &str, name: &str, capacity: u32, kind: RoomKind) -> RoomRecord {
    RoomRecord {
        id: id.to_string(),
        name: name.to_string(),
        capacity,
        kind,
    }
}

fn course(
    id: &str,
    name: &str,
    major: &str,
    year: u32,
    days: u32,
    hours: u32,
    instructor: &str,
    kind: RoomKind,
) -> CourseRecord {
    CourseRecord {
        id: id.to_string(),
        name: name.to_string(),
        department: "CS".to_string(),
        major: major.to_string(),
        days_per_week: days,
        hours_per_day: hours,
        instructor_id: instructor.to_string(),
        year,
        kind,
        duration: None,
    }
}

fn availability(instructor: &str, name: &str, day: &str, start: &str, end: &str) -> AvailabilityRecord {
    AvailabilityRecord {
        instructor_id: instructor.to_string(),
        instructor_name: name.to_string(),
        department: "CS".to_string(),
        day: day.to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
    }
}

fn division(id: &str, major: &str, year: u32, students: u32) -> DivisionRecord {
    DivisionRecord {
        id: id.to_string(),
        department: "CS".to_string(),
        major: major.to_string(),
        year,
        student_count: students,
    }
}

fn campus_input() -> SchedulingData {
    SchedulingData {
        rooms: vec![
            room("R1", "Hall A", 60, RoomKind::Lecture),
            room("R2", "Hall B", 40, RoomKind::Lecture),
            room("R3", "Lab 1", 25, RoomKind::Lab),
        ],
        courses: vec![
            course("C1", "Algorithms", "SE", 1, 2, 1, "I1", RoomKind::Lecture),
            course("C2", "Databases", "SE", 2, 2, 2, "I2", RoomKind::Lecture),
            course("C3", "Networks Lab", "IS", 1, 1, 2, "I1", RoomKind::Lab),
        ],
        instructors: vec![
            availability("I1", "Dr. Ahmed", "Monday", "09:00", "15:00"),
            availability("I1", "Dr. Ahmed", "Tuesday", "09:00", "15:00"),
            availability("I1", "Dr. Ahmed", "Wednesday", "09:00", "15:00"),
            availability("I2", "Dr. Basim", "Monday", "10:00", "16:00"),
            availability("I2", "Dr. Basim", "Thursday", "10:00", "16:00"),
        ],
        divisions: vec![
            division("D1", "SE", 1, 80),
            division("D2", "SE", 2, 50),
            division("D3", "IS", 1, 30),
        ],
    }
}

fn config(seed: u64) -> GaConfig {
    GaConfig {
        population_size: 20,
        generations: 40,
        mutation_rate: 0.2,
        crossover_rate: 0.8,
        seed: Some(seed),
    }
}

#[test]
fn full_pipeline_produces_a_verified_schedule() {
    let input = campus_input();
    let data = SchedulingDataSet::build(&input).unwrap();
    assert_eq!(data.pairs().len(), 3);

    let mut engine = GeneticOptimizer::new(&data, config(2024));
    let outcome = engine.run(None, None);
    assert_eq!(outcome.generations_run, 40);
    assert_eq!(outcome.fitness_history.len(), 40);
    for pair in outcome.fitness_history.windows(2) {
        assert!(pair[1] <= pair[0]);
    }

    let mut best = outcome.best;
    let report = repair_conflicts(&mut best, &data);

    // every pair keeps its day quota through evolution and repair
    let mut day_groups: HashMap<(&str, &str), Vec<&Assignment>> = HashMap::new();
    for a in &best {
        day_groups
            .entry((a.course_id.0.as_str(), a.day.as_str()))
            .or_default()
            .push(a);
    }
    let days_of = |course: &str| {
        day_groups
            .keys()
            .filter(|(c, _)| *c == course)
            .count()
    };
    assert_eq!(days_of("C1"), 2);
    assert_eq!(days_of("C2"), 2);
    assert_eq!(days_of("C3"), 1);

    // every cohort fits a single room here; the lab course can only ever
    // land in the one lab
    for a in &best {
        if a.course_id.0 == "C3" {
            assert_eq!(a.room_id.0, "R3");
        }
    }

    let records = format_schedule(&best, &data);
    assert_eq!(records.len(), best.len());

    let audit = ScheduleChecker::analyze(&records).unwrap();
    // repair never creates new room double-bookings, so the audit can only
    // see conflicts the repair pass already reported
    assert!(audit.room_conflicts.len() <= report.residual.len());
    if outcome.best_fitness == 0.0 {
        assert!(audit.room_conflicts.is_empty());
        assert!(audit.capacity_overflows.is_empty());
    }
}

#[test]
fn split_cohort_flows_through_to_parallel_records() {
    let mut input = campus_input();
    // shrink the halls so SE year 1 (effective 40) must split 25 + 15
    input.rooms[0].capacity = 25;
    input.rooms[1].capacity = 25;
    let data = SchedulingDataSet::build(&input).unwrap();

    let pair = data
        .pairs()
        .iter()
        .find(|p| p.course_id.0 == "C1")
        .unwrap();
    assert!(pair.is_split());

    let mut engine = GeneticOptimizer::new(&data, config(7));
    let outcome = engine.run(None, None);
    let mut best = outcome.best;
    repair_conflicts(&mut best, &data);
    let records = format_schedule(&best, &data);

    // each C1 session day exports two parallel rows at the same clock time
    let mut by_day: HashMap<&str, Vec<_>> = HashMap::new();
    for r in records.iter().filter(|r| r.course_name == "Algorithms") {
        by_day.entry(r.day.as_str()).or_default().push(r);
    }
    assert_eq!(by_day.len(), 2);
    for rows in by_day.values() {
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].start_time, rows[1].start_time);
        assert_eq!(rows[0].end_time, rows[1].end_time);
        assert_ne!(rows[0].room_name, rows[1].room_name);
        let seats: u32 = rows.iter().map(|r| r.offline_student_count).sum();
        assert_eq!(seats, 40);
        for row in rows {
            assert!(row.offline_student_count <= row.room_capacity);
        }
    }

    // the audit treats the parallel rows as deliberate, not as a division
    // double-booking
    let audit = ScheduleChecker::analyze(&records).unwrap();
    assert!(audit.division_conflicts.is_empty());
}

#[test]
fn deterministic_runs_export_identical_records() {
    let input = campus_input();
    let data = SchedulingDataSet::build(&input).unwrap();

    let run = |seed| {
        let mut engine = GeneticOptimizer::new(&data, config(seed));
        let mut best = engine.run(None, None).best;
        repair_conflicts(&mut best, &data);
        format_schedule(&best, &data)
    };

    assert_eq!(run(99), run(99));
}

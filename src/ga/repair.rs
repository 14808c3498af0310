use serde::Serialize;

use crate::dataset::{CourseId, RoomId, SchedulingDataSet};
use crate::ga::individual::{has_conflict, required_seats, Assignment, Individual, DEFAULT_SLOT_STARTS};
use crate::timeutil;

/// Local repair moves, tried in order until one lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RepairStrategy {
    RoomSwap,
    TimeShift,
    DaySwap,
}

const STRATEGY_ORDER: [RepairStrategy; 3] = [
    RepairStrategy::RoomSwap,
    RepairStrategy::TimeShift,
    RepairStrategy::DaySwap,
];

/// A room double-booking the repair pass could not untangle.
#[derive(Debug, Clone, Serialize)]
pub struct ResidualConflict {
    pub room_id: RoomId,
    pub day: String,
    pub course_a: CourseId,
    pub course_b: CourseId,
    pub start_a: u32,
    pub end_a: u32,
    pub start_b: u32,
    pub end_b: u32,
}

#[derive(Debug, Default)]
pub struct RepairReport {
    pub resolved: usize,
    pub residual: Vec<ResidualConflict>,
}

/// Deterministic cleanup of the final best candidate: finds room
/// double-bookings among non-split assignments and, per conflict, moves the
/// session with the smaller head count through RoomSwap → TimeShift →
/// DaySwap. Whatever survives is reported, never fatal.
pub fn repair_conflicts(schedule: &mut Individual, data: &SchedulingDataSet) -> RepairReport {
    let mut report = RepairReport::default();

    for (i, j) in room_conflicts(schedule) {
        // an earlier move may already have separated this pairing
        if !still_conflicting(schedule, i, j) {
            continue;
        }
        let mover = pick_mover(schedule, data, i, j);
        let fixed = STRATEGY_ORDER
            .iter()
            .any(|&strategy| apply_strategy(strategy, schedule, data, mover));
        if fixed {
            report.resolved += 1;
        } else {
            let (a, b) = (&schedule[i], &schedule[j]);
            report.residual.push(ResidualConflict {
                room_id: a.room_id.clone(),
                day: a.day.clone(),
                course_a: a.course_id.clone(),
                course_b: b.course_id.clone(),
                start_a: a.start_minute,
                end_a: a.end_minute,
                start_b: b.start_minute,
                end_b: b.end_minute,
            });
        }
    }
    report
}

fn room_conflicts(schedule: &[Assignment]) -> Vec<(usize, usize)> {
    let mut found = Vec::new();
    for i in 0..schedule.len() {
        for j in (i + 1)..schedule.len() {
            let (a, b) = (&schedule[i], &schedule[j]);
            if a.is_split || b.is_split {
                continue;
            }
            if a.room_id == b.room_id
                && a.day == b.day
                && timeutil::overlaps(a.start_minute, a.end_minute, b.start_minute, b.end_minute)
            {
                found.push((i, j));
            }
        }
    }
    found
}

fn still_conflicting(schedule: &[Assignment], i: usize, j: usize) -> bool {
    let (a, b) = (&schedule[i], &schedule[j]);
    a.room_id == b.room_id
        && a.day == b.day
        && timeutil::overlaps(a.start_minute, a.end_minute, b.start_minute, b.end_minute)
}

fn pick_mover(schedule: &[Assignment], data: &SchedulingDataSet, i: usize, j: usize) -> usize {
    if required_seats(data, &schedule[i]) <= required_seats(data, &schedule[j]) {
        i
    } else {
        j
    }
}

fn apply_strategy(
    strategy: RepairStrategy,
    schedule: &mut Individual,
    data: &SchedulingDataSet,
    mover: usize,
) -> bool {
    match strategy {
        RepairStrategy::RoomSwap => room_swap(schedule, data, mover),
        RepairStrategy::TimeShift => time_shift(schedule, mover),
        RepairStrategy::DaySwap => day_swap(schedule, data, mover),
    }
}

/// Another same-kind room with enough seats, free at the existing day/time.
fn room_swap(schedule: &mut Individual, data: &SchedulingDataSet, mover: usize) -> bool {
    let (day, start, end, current) = {
        let a = &schedule[mover];
        (a.day.clone(), a.start_minute, a.end_minute, a.room_id.clone())
    };
    let Some(course) = data.course(&schedule[mover].course_id) else {
        return false;
    };
    let kind = course.kind;
    let needed = required_seats(data, &schedule[mover]);

    for candidate in data.rooms_of_kind(kind) {
        if *candidate == current {
            continue;
        }
        let fits = data.room(candidate).is_some_and(|r| r.capacity >= needed);
        if !fits {
            continue;
        }
        let busy = schedule.iter().enumerate().any(|(k, other)| {
            k != mover
                && other.room_id == *candidate
                && other.day == day
                && timeutil::overlaps(start, end, other.start_minute, other.end_minute)
        });
        if !busy {
            schedule[mover].room_id = candidate.clone();
            return true;
        }
    }
    false
}

/// Another default hourly slot on the same day with no room, instructor, or
/// division clash.
fn time_shift(schedule: &mut Individual, mover: usize) -> bool {
    let (day, duration, start, instructor, room, division) = {
        let a = &schedule[mover];
        (
            a.day.clone(),
            a.duration_minutes,
            a.start_minute,
            a.instructor_id.clone(),
            a.room_id.clone(),
            a.division_id.clone(),
        )
    };
    for slot in DEFAULT_SLOT_STARTS {
        if slot == start {
            continue;
        }
        let end = slot + duration;
        let free = !has_conflict(
            schedule,
            &day,
            slot,
            end,
            &instructor,
            std::slice::from_ref(&room),
            Some(&division),
            Some(mover),
        );
        if free {
            schedule[mover].start_minute = slot;
            schedule[mover].end_minute = end;
            return true;
        }
    }
    false
}

/// The same time window on another weekday, checked against all three
/// conflict kinds.
fn day_swap(schedule: &mut Individual, data: &SchedulingDataSet, mover: usize) -> bool {
    let (day, start, end, instructor, room, division) = {
        let a = &schedule[mover];
        (
            a.day.clone(),
            a.start_minute,
            a.end_minute,
            a.instructor_id.clone(),
            a.room_id.clone(),
            a.division_id.clone(),
        )
    };
    for candidate in data.days() {
        if *candidate == day {
            continue;
        }
        let free = !has_conflict(
            schedule,
            candidate,
            start,
            end,
            &instructor,
            std::slice::from_ref(&room),
            Some(&division),
            Some(mover),
        );
        if free {
            schedule[mover].day = candidate.clone();
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AvailabilityRecord, CourseRecord, DivisionRecord, RoomKind, RoomRecord, SchedulingData,
    };

    fn room(id: &str, capacity: u32) -> RoomRecord {
        RoomRecord {
            id: id.to_string(),
            name: format!("Room {id}"),
            capacity,
            kind: RoomKind::Lecture,
        }
    }

    fn course(id: &str, instructor: &str, major: &str) -> CourseRecord {
        CourseRecord {
            id: id.to_string(),
            name: format!("Course {id}"),
            department: "CS".to_string(),
            major: major.to_string(),
            days_per_week: 1,
            hours_per_day: 1,
            instructor_id: instructor.to_string(),
            year: 1,
            kind: RoomKind::Lecture,
            duration: None,
        }
    }

    fn division(id: &str, major: &str, students: u32) -> DivisionRecord {
        DivisionRecord {
            id: id.to_string(),
            department: "CS".to_string(),
            major: major.to_string(),
            year: 1,
            student_count: students,
        }
    }

    fn availability(instructor: &str, day: &str) -> AvailabilityRecord {
        AvailabilityRecord {
            instructor_id: instructor.to_string(),
            instructor_name: format!("Dr. {instructor}"),
            department: "CS".to_string(),
            day: day.to_string(),
            start_time: "08:00".to_string(),
            end_time: "16:00".to_string(),
        }
    }

    fn two_course_input(rooms: Vec<RoomRecord>) -> SchedulingData {
        SchedulingData {
            rooms,
            courses: vec![course("C1", "I1", "SE"), course("C2", "I2", "IS")],
            instructors: vec![availability("I1", "Monday"), availability("I2", "Monday")],
            divisions: vec![division("D1", "SE", 30), division("D2", "IS", 20)],
        }
    }

    fn assignment(data: &SchedulingDataSet, course: &str, room: &str, day: &str, start: u32) -> Assignment {
        let pair = data.pair_demand(&CourseId::from(course)).unwrap();
        let instructor = data.course(&pair.course_id).unwrap().instructor_id.clone();
        Assignment {
            course_id: pair.course_id.clone(),
            instructor_id: instructor,
            division_id: pair.division_id.clone(),
            room_id: RoomId::from(room),
            day: day.to_string(),
            start_minute: start,
            end_minute: start + 60,
            duration_minutes: 60,
            assigned_students: None,
            is_split: false,
        }
    }

    #[test]
    fn room_swap_resolves_a_double_booking() {
        let input = two_course_input(vec![room("R1", 40), room("R2", 40)]);
        let data = SchedulingDataSet::build(&input).unwrap();
        let mut schedule = vec![
            assignment(&data, "C1", "R1", "Monday", 540),
            assignment(&data, "C2", "R1", "Monday", 540),
        ];
        let report = repair_conflicts(&mut schedule, &data);

        assert_eq!(report.resolved, 1);
        assert!(report.residual.is_empty());
        // C2's division is smaller, so C2 moved
        assert_eq!(schedule[0].room_id, RoomId::from("R1"));
        assert_eq!(schedule[1].room_id, RoomId::from("R2"));
        assert_eq!(schedule[1].start_minute, 540);
    }

    #[test]
    fn time_shift_kicks_in_when_rooms_are_saturated() {
        let input = two_course_input(vec![room("R1", 40)]);
        let data = SchedulingDataSet::build(&input).unwrap();
        let mut schedule = vec![
            assignment(&data, "C1", "R1", "Monday", 540),
            assignment(&data, "C2", "R1", "Monday", 540),
        ];
        let report = repair_conflicts(&mut schedule, &data);

        assert_eq!(report.resolved, 1);
        assert_eq!(schedule[1].room_id, RoomId::from("R1"));
        assert_ne!(schedule[1].start_minute, 540);
        assert!(!still_conflicting(&schedule, 0, 1));
    }

    #[test]
    fn day_swap_is_the_last_resort() {
        let input = SchedulingData {
            rooms: vec![room("R1", 40)],
            courses: vec![course("C1", "I1", "SE"), course("C2", "I2", "IS")],
            instructors: vec![
                availability("I1", "Monday"),
                availability("I2", "Monday"),
                availability("I2", "Tuesday"),
            ],
            divisions: vec![division("D1", "SE", 30), division("D2", "IS", 20)],
        };
        let data = SchedulingDataSet::build(&input).unwrap();
        // every default slot on Monday is taken by C1's division sessions,
        // so the mover can only escape to another day
        let mut schedule: Individual = DEFAULT_SLOT_STARTS
            .iter()
            .map(|&slot| assignment(&data, "C1", "R1", "Monday", slot))
            .collect();
        schedule.push(assignment(&data, "C2", "R1", "Monday", 540));

        let report = repair_conflicts(&mut schedule, &data);
        assert_eq!(report.resolved, 1);
        let moved = schedule.last().unwrap();
        assert_eq!(moved.day, "Tuesday");
        assert_eq!(moved.start_minute, 540);
    }

    #[test]
    fn unresolvable_conflicts_are_reported_not_fatal() {
        let input = two_course_input(vec![room("R1", 40)]);
        let data = SchedulingDataSet::build(&input).unwrap();
        // one day universe, every slot filled twice over: nothing can move
        let mut schedule = Individual::new();
        for slot in DEFAULT_SLOT_STARTS {
            schedule.push(assignment(&data, "C1", "R1", "Monday", slot));
            schedule.push(assignment(&data, "C2", "R1", "Monday", slot));
        }
        let report = repair_conflicts(&mut schedule, &data);

        assert!(!report.residual.is_empty());
        let residual = &report.residual[0];
        assert_eq!(residual.room_id, RoomId::from("R1"));
        assert_eq!(residual.day, "Monday");
    }

    #[test]
    fn split_assignments_are_never_moved() {
        let input = two_course_input(vec![room("R1", 40), room("R2", 40)]);
        let data = SchedulingDataSet::build(&input).unwrap();
        let mut a = assignment(&data, "C1", "R1", "Monday", 540);
        a.is_split = true;
        a.assigned_students = Some(20);
        let mut b = assignment(&data, "C2", "R1", "Monday", 540);
        b.is_split = true;
        b.assigned_students = Some(10);
        let mut schedule = vec![a.clone(), b.clone()];

        let report = repair_conflicts(&mut schedule, &data);
        assert_eq!(report.resolved, 0);
        assert!(report.residual.is_empty());
        assert_eq!(schedule, vec![a, b]);
    }

    #[test]
    fn ties_on_head_count_move_the_first_party() {
        let mut input = two_course_input(vec![room("R1", 40), room("R2", 40)]);
        input.divisions[1].student_count = 30;
        let data = SchedulingDataSet::build(&input).unwrap();
        let mut schedule = vec![
            assignment(&data, "C1", "R1", "Monday", 540),
            assignment(&data, "C2", "R1", "Monday", 540),
        ];
        let report = repair_conflicts(&mut schedule, &data);
        assert_eq!(report.resolved, 1);
        assert_eq!(schedule[0].room_id, RoomId::from("R2"));
        assert_eq!(schedule[1].room_id, RoomId::from("R1"));
    }
}

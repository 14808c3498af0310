use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;
use crate::models::{RoomKind, SchedulingData};
use crate::timeutil;

/// Weekday universe used when no availability rows name any days.
pub const DEFAULT_DAYS: [&str; 6] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Saturday",
];

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

define_id!(RoomId);
define_id!(CourseId);
define_id!(InstructorId);
define_id!(DivisionId);

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub capacity: u32,
    pub kind: RoomKind,
}

#[derive(Debug, Clone)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub department: String,
    pub major: String,
    pub year: u32,
    pub kind: RoomKind,
    pub days_per_week: u32,
    pub hours_per_day: u32,
    pub instructor_id: InstructorId,
}

impl Course {
    pub fn session_minutes(&self) -> u32 {
        self.hours_per_day * 60
    }
}

#[derive(Debug, Clone)]
pub struct Division {
    pub id: DivisionId,
    pub department: String,
    pub major: String,
    pub year: u32,
    pub student_count: u32,
}

/// Availability windows of one instructor on one day, sorted by start.
/// A window whose end precedes its start wraps past midnight.
pub type AvailabilityWindows = Vec<(u32, u32)>;

/// Maps a division's total head count to the number of students expected in
/// the room at once.
pub type DemandPolicy = fn(u32) -> u32;

/// Alternating half-cohort rotation: each session seats `ceil(total / 2)`.
pub fn half_rotation(total_students: u32) -> u32 {
    total_students.div_ceil(2)
}

/// Crossover/grouping key: one course bound to its single division.
pub type PairKey = (CourseId, DivisionId);

/// One scheduling obligation with its precomputed room plan.
#[derive(Debug, Clone)]
pub struct PairDemand {
    pub course_id: CourseId,
    pub division_id: DivisionId,
    /// Seats one session must provide under the demand policy.
    pub effective_students: u32,
    /// Candidate rooms, ascending by capacity. For split pairs this is the
    /// exact parallel room set rather than a pool to pick one room from.
    pub room_pool: Vec<RoomId>,
    /// Largest-first (room, seats) allocation; present only when the pair
    /// needs two or more parallel rooms.
    pub split_allocation: Option<Vec<(RoomId, u32)>>,
}

impl PairDemand {
    pub fn is_split(&self) -> bool {
        self.split_allocation.is_some()
    }

    pub fn key(&self) -> PairKey {
        (self.course_id.clone(), self.division_id.clone())
    }
}

/// Normalized, validated view of one scheduling problem with every derived
/// index built once. Read-only during the search.
#[derive(Debug)]
pub struct SchedulingDataSet {
    rooms: HashMap<RoomId, Room>,
    lecture_rooms: Vec<RoomId>,
    lab_rooms: Vec<RoomId>,
    courses: HashMap<CourseId, Course>,
    divisions: HashMap<DivisionId, Division>,
    instructor_names: HashMap<InstructorId, String>,
    availability: HashMap<InstructorId, HashMap<String, AvailabilityWindows>>,
    days: Vec<String>,
    pairs: Vec<PairDemand>,
    pair_by_course: HashMap<CourseId, usize>,
    warnings: Vec<String>,
}

impl SchedulingDataSet {
    pub fn build(input: &SchedulingData) -> Result<Self, SchedulerError> {
        Self::build_with_policy(input, half_rotation)
    }

    pub fn build_with_policy(
        input: &SchedulingData,
        policy: DemandPolicy,
    ) -> Result<Self, SchedulerError> {
        let mut warnings = Vec::new();

        let mut rooms: HashMap<RoomId, Room> = HashMap::new();
        for rec in &input.rooms {
            let room = Room {
                id: RoomId(rec.id.clone()),
                name: rec.name.clone(),
                capacity: rec.capacity,
                kind: rec.kind,
            };
            if rooms.insert(room.id.clone(), room).is_some() {
                warnings.push(format!("duplicate room id {}, keeping the last row", rec.id));
            }
        }
        let lecture_rooms = rooms_by_capacity(&rooms, RoomKind::Lecture);
        let lab_rooms = rooms_by_capacity(&rooms, RoomKind::Lab);

        let mut courses: HashMap<CourseId, Course> = HashMap::new();
        let mut course_order: Vec<CourseId> = Vec::new();
        for rec in &input.courses {
            if !(1..=6).contains(&rec.days_per_week) {
                return Err(SchedulerError::InvalidCourseDefinition {
                    course_id: rec.id.clone(),
                    days_per_week: rec.days_per_week as i64,
                });
            }
            if rec.hours_per_day == 0 {
                return Err(SchedulerError::DataValidation(format!(
                    "course {}: hours_per_day must be positive",
                    rec.id
                )));
            }
            let course = Course {
                id: CourseId(rec.id.clone()),
                name: rec.name.clone(),
                department: rec.department.clone(),
                major: rec.major.clone(),
                year: rec.year,
                kind: rec.kind,
                days_per_week: rec.days_per_week,
                hours_per_day: rec.hours_per_day,
                instructor_id: InstructorId(rec.instructor_id.clone()),
            };
            if courses.insert(course.id.clone(), course).is_some() {
                warnings.push(format!(
                    "duplicate course id {}, keeping the last row",
                    rec.id
                ));
            } else {
                course_order.push(CourseId(rec.id.clone()));
            }
        }

        let mut divisions: HashMap<DivisionId, Division> = HashMap::new();
        for rec in &input.divisions {
            let division = Division {
                id: DivisionId(rec.id.clone()),
                department: rec.department.clone(),
                major: rec.major.clone(),
                year: rec.year,
                student_count: rec.student_count,
            };
            if divisions.insert(division.id.clone(), division).is_some() {
                warnings.push(format!(
                    "duplicate division id {}, keeping the last row",
                    rec.id
                ));
            }
        }

        let mut instructor_names: HashMap<InstructorId, String> = HashMap::new();
        let mut availability: HashMap<InstructorId, HashMap<String, AvailabilityWindows>> =
            HashMap::new();
        let mut days: Vec<String> = Vec::new();
        for rec in &input.instructors {
            let id = InstructorId(rec.instructor_id.clone());
            instructor_names
                .entry(id.clone())
                .or_insert_with(|| rec.instructor_name.clone());
            let start = timeutil::parse_clock(&rec.start_time)?;
            let end = timeutil::parse_clock(&rec.end_time)?;
            if !days.iter().any(|d| d == &rec.day) {
                days.push(rec.day.clone());
            }
            availability
                .entry(id)
                .or_default()
                .entry(rec.day.clone())
                .or_default()
                .push((start, end));
        }
        for day_windows in availability.values_mut() {
            for windows in day_windows.values_mut() {
                windows.sort_unstable();
            }
        }
        if days.is_empty() {
            days = DEFAULT_DAYS.iter().map(|d| d.to_string()).collect();
        }

        let mut pairs: Vec<PairDemand> = Vec::new();
        let mut pair_by_course: HashMap<CourseId, usize> = HashMap::new();
        for course_id in &course_order {
            let course = &courses[course_id];
            if !instructor_names.contains_key(&course.instructor_id) {
                warnings.push(format!(
                    "course {}: instructor {} has no availability rows",
                    course.id, course.instructor_id
                ));
            }
            let Some(division) = match_division(course, &divisions) else {
                warnings.push(format!(
                    "course {}: no division matches (year {}, major {}, department {}); course dropped",
                    course.id, course.year, course.major, course.department
                ));
                continue;
            };
            let effective = policy(division.student_count);
            let by_kind = match course.kind {
                RoomKind::Lecture => &lecture_rooms,
                RoomKind::Lab => &lab_rooms,
            };
            let (room_pool, split_allocation) =
                plan_rooms(course, effective, &rooms, by_kind, &mut warnings);
            if room_pool.is_empty() {
                warnings.push(format!(
                    "course {}: no {:?} rooms exist, its sessions cannot be placed",
                    course.id, course.kind
                ));
            }
            let demand = PairDemand {
                course_id: course.id.clone(),
                division_id: division.id.clone(),
                effective_students: effective,
                room_pool,
                split_allocation,
            };
            pair_by_course.insert(demand.course_id.clone(), pairs.len());
            pairs.push(demand);
        }

        Ok(Self {
            rooms,
            lecture_rooms,
            lab_rooms,
            courses,
            divisions,
            instructor_names,
            availability,
            days,
            pairs,
            pair_by_course,
            warnings,
        })
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    /// Rooms of one kind, ascending by capacity.
    pub fn rooms_of_kind(&self, kind: RoomKind) -> &[RoomId] {
        match kind {
            RoomKind::Lecture => &self.lecture_rooms,
            RoomKind::Lab => &self.lab_rooms,
        }
    }

    pub fn course(&self, id: &CourseId) -> Option<&Course> {
        self.courses.get(id)
    }

    pub fn division(&self, id: &DivisionId) -> Option<&Division> {
        self.divisions.get(id)
    }

    pub fn instructor_name(&self, id: &InstructorId) -> Option<&str> {
        self.instructor_names.get(id).map(String::as_str)
    }

    pub fn availability_for(&self, instructor: &InstructorId, day: &str) -> Option<&[(u32, u32)]> {
        self.availability
            .get(instructor)?
            .get(day)
            .map(Vec::as_slice)
    }

    /// Known weekdays, in first-seen order of the availability rows.
    pub fn days(&self) -> &[String] {
        &self.days
    }

    /// Canonical scheduling obligations, in course input order.
    pub fn pairs(&self) -> &[PairDemand] {
        &self.pairs
    }

    /// A course has at most one pair, so the course id alone resolves it.
    pub fn pair_demand(&self, course: &CourseId) -> Option<&PairDemand> {
        self.pair_by_course.get(course).map(|&idx| &self.pairs[idx])
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

fn rooms_by_capacity(rooms: &HashMap<RoomId, Room>, kind: RoomKind) -> Vec<RoomId> {
    let mut ids: Vec<RoomId> = rooms
        .values()
        .filter(|r| r.kind == kind)
        .map(|r| r.id.clone())
        .collect();
    ids.sort_by(|a, b| {
        rooms[a]
            .capacity
            .cmp(&rooms[b].capacity)
            .then_with(|| a.cmp(b))
    });
    ids
}

/// Picks the single division a course serves: exact (year, major, department)
/// match with the largest head count, falling back to (year, department).
fn match_division<'a>(
    course: &Course,
    divisions: &'a HashMap<DivisionId, Division>,
) -> Option<&'a Division> {
    let largest = |exact_major: bool| {
        divisions
            .values()
            .filter(|d| {
                d.year == course.year
                    && d.department == course.department
                    && (!exact_major || d.major == course.major)
            })
            .max_by(|a, b| {
                a.student_count
                    .cmp(&b.student_count)
                    .then_with(|| b.id.cmp(&a.id))
            })
    };
    largest(true).or_else(|| largest(false))
}

/// Room plan for one pair. When the largest room of the kind seats the
/// effective demand the pair gets a pool of qualifying rooms (ascending, so
/// large rooms stay free for large cohorts); otherwise rooms are allocated
/// largest-first into a parallel split until the demand is seated.
fn plan_rooms(
    course: &Course,
    effective_students: u32,
    rooms: &HashMap<RoomId, Room>,
    by_kind: &[RoomId],
    warnings: &mut Vec<String>,
) -> (Vec<RoomId>, Option<Vec<(RoomId, u32)>>) {
    let Some(largest_id) = by_kind.last() else {
        return (Vec::new(), None);
    };

    if rooms[largest_id].capacity >= effective_students {
        let pool: Vec<RoomId> = by_kind
            .iter()
            .filter(|id| rooms[*id].capacity >= effective_students)
            .cloned()
            .collect();
        return (pool, None);
    }

    let mut remaining = effective_students;
    let mut allocation: Vec<(RoomId, u32)> = Vec::new();
    for id in by_kind.iter().rev() {
        if remaining == 0 {
            break;
        }
        let seats = rooms[id].capacity.min(remaining);
        if seats == 0 {
            continue;
        }
        allocation.push((id.clone(), seats));
        remaining -= seats;
    }
    if remaining > 0 {
        warnings.push(format!(
            "course {}: {} students cannot be seated across all {:?} rooms (short by {})",
            course.id, effective_students, course.kind, remaining
        ));
    }

    if allocation.len() >= 2 {
        let pool = allocation.iter().map(|(id, _)| id.clone()).collect();
        (pool, Some(allocation))
    } else {
        // a single room still hosts the whole pair, overflow and all; the
        // deficit is absorbed as fitness penalty
        (allocation.into_iter().map(|(id, _)| id).collect(), None)
    }
}

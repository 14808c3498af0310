use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::Serialize;

use crate::dataset::{
    Course, CourseId, DivisionId, InstructorId, PairDemand, PairKey, RoomId, SchedulingDataSet,
};
use crate::timeutil::{self, MINUTES_PER_DAY};

/// Hourly fallback start times between 08:00 and 16:00.
pub const DEFAULT_SLOT_STARTS: [u32; 9] = [480, 540, 600, 660, 720, 780, 840, 900, 960];

/// One scheduled session of a course-division pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub course_id: CourseId,
    pub instructor_id: InstructorId,
    pub division_id: DivisionId,
    pub room_id: RoomId,
    pub day: String,
    pub start_minute: u32,
    pub end_minute: u32,
    pub duration_minutes: u32,
    /// Seats taken in this room; set only for split sessions.
    pub assigned_students: Option<u32>,
    pub is_split: bool,
}

impl Assignment {
    pub fn pair_key(&self) -> PairKey {
        (self.course_id.clone(), self.division_id.clone())
    }
}

/// One complete candidate schedule.
pub type Individual = Vec<Assignment>;

/// Seats a session of `a` must provide: the split allocation when present,
/// otherwise the pair's effective demand.
pub(crate) fn required_seats(data: &SchedulingDataSet, a: &Assignment) -> u32 {
    if let Some(n) = a.assigned_students {
        return n;
    }
    data.pair_demand(&a.course_id)
        .map(|p| p.effective_students)
        .or_else(|| data.division(&a.division_id).map(|d| d.student_count))
        .unwrap_or(0)
}

/// True when any assignment on `day` overlapping [start, end) collides on
/// instructor, one of `rooms`, or the division. `exclude` is the index of
/// the assignment being moved, so it never collides with itself.
pub(crate) fn has_conflict(
    schedule: &[Assignment],
    day: &str,
    start: u32,
    end: u32,
    instructor: &InstructorId,
    rooms: &[RoomId],
    division: Option<&DivisionId>,
    exclude: Option<usize>,
) -> bool {
    schedule.iter().enumerate().any(|(idx, other)| {
        if exclude == Some(idx) || other.day != day {
            return false;
        }
        if !timeutil::overlaps(start, end, other.start_minute, other.end_minute) {
            return false;
        }
        other.instructor_id == *instructor
            || rooms.iter().any(|r| other.room_id == *r)
            || division.is_some_and(|d| other.division_id == *d)
    })
}

/// Builds one complete candidate timetable.
///
/// Every course-division pair receives `days_per_week` day groups. Placement
/// tries conflict-free slots inside the instructor's declared availability
/// first, then the default hourly slots, and finally forces a placement so
/// the fitness function penalizes the damage instead of the builder failing.
pub fn build_individual<R: Rng + ?Sized>(data: &SchedulingDataSet, rng: &mut R) -> Individual {
    let mut schedule = Individual::new();

    for pair in data.pairs() {
        let Some(course) = data.course(&pair.course_id) else {
            continue;
        };
        if pair.room_pool.is_empty() {
            // unplaceable; fitness charges the missing pair
            continue;
        }
        let duration = course.session_minutes();

        for day in pick_days(data, &course.instructor_id, course.days_per_week as usize, rng) {
            place_day(&mut schedule, data, pair, course, &day, duration, rng);
        }
    }

    schedule
}

/// Chooses session days, preferring days with declared instructor
/// availability; repeats a day only when the weekday universe itself is too
/// small.
fn pick_days<R: Rng + ?Sized>(
    data: &SchedulingDataSet,
    instructor: &InstructorId,
    needed: usize,
    rng: &mut R,
) -> Vec<String> {
    let all = data.days();
    let declared: Vec<&String> = all
        .iter()
        .filter(|d| data.availability_for(instructor, d).is_some())
        .collect();
    let base: Vec<&String> = if declared.is_empty() {
        all.iter().collect()
    } else {
        declared
    };

    let mut chosen: Vec<String> = if base.len() >= needed {
        base.choose_multiple(rng, needed).map(|d| (*d).clone()).collect()
    } else {
        let mut days: Vec<String> = base.iter().map(|d| (*d).clone()).collect();
        let rest: Vec<&String> = all.iter().filter(|d| !days.contains(*d)).collect();
        days.extend(
            rest.choose_multiple(rng, needed - days.len())
                .map(|d| (*d).clone()),
        );
        days
    };

    while chosen.len() < needed {
        match all.choose(rng) {
            Some(day) => chosen.push(day.clone()),
            None => break,
        }
    }
    chosen
}

fn place_day<R: Rng + ?Sized>(
    schedule: &mut Individual,
    data: &SchedulingDataSet,
    pair: &PairDemand,
    course: &Course,
    day: &str,
    duration: u32,
    rng: &mut R,
) {
    // 1. a conflict-free slot inside declared availability
    if let Some(windows) = data.availability_for(&course.instructor_id, day) {
        let mut usable: Vec<(u32, u32)> = windows
            .iter()
            .copied()
            .filter(|&(ws, we)| timeutil::window_length(ws, we) >= duration)
            .collect();
        usable.shuffle(rng);
        for (win_start, win_end) in usable {
            let end = (win_start + duration) % MINUTES_PER_DAY;
            if !timeutil::fits_in_window(win_start, end, win_start, win_end) {
                continue;
            }
            if try_place(schedule, pair, course, day, win_start, end, duration, rng) {
                return;
            }
        }
    }

    // 2. a conflict-free default hourly slot
    let mut slots = DEFAULT_SLOT_STARTS.to_vec();
    slots.shuffle(rng);
    for slot in slots {
        if try_place(schedule, pair, course, day, slot, slot + duration, duration, rng) {
            return;
        }
    }

    // 3. forced placement; the resulting conflicts surface in the fitness
    let slot = DEFAULT_SLOT_STARTS.choose(rng).copied().unwrap_or(480);
    force_place(schedule, pair, course, day, slot, slot + duration, duration, rng);
}

#[allow(clippy::too_many_arguments)]
fn try_place<R: Rng + ?Sized>(
    schedule: &mut Individual,
    pair: &PairDemand,
    course: &Course,
    day: &str,
    start: u32,
    end: u32,
    duration: u32,
    rng: &mut R,
) -> bool {
    if let Some(allocation) = &pair.split_allocation {
        let free = !has_conflict(
            schedule,
            day,
            start,
            end,
            &course.instructor_id,
            &pair.room_pool,
            Some(&pair.division_id),
            None,
        );
        if !free {
            return false;
        }
        for (room, seats) in allocation {
            schedule.push(assignment(pair, course, room.clone(), day, start, end, duration, Some(*seats)));
        }
        true
    } else {
        let mut pool = pair.room_pool.clone();
        pool.shuffle(rng);
        for room in pool {
            let free = !has_conflict(
                schedule,
                day,
                start,
                end,
                &course.instructor_id,
                std::slice::from_ref(&room),
                Some(&pair.division_id),
                None,
            );
            if free {
                schedule.push(assignment(pair, course, room, day, start, end, duration, None));
                return true;
            }
        }
        false
    }
}

#[allow(clippy::too_many_arguments)]
fn force_place<R: Rng + ?Sized>(
    schedule: &mut Individual,
    pair: &PairDemand,
    course: &Course,
    day: &str,
    start: u32,
    end: u32,
    duration: u32,
    rng: &mut R,
) {
    if let Some(allocation) = &pair.split_allocation {
        for (room, seats) in allocation {
            schedule.push(assignment(pair, course, room.clone(), day, start, end, duration, Some(*seats)));
        }
    } else if let Some(room) = pair.room_pool.choose(rng) {
        schedule.push(assignment(pair, course, room.clone(), day, start, end, duration, None));
    }
}

#[allow(clippy::too_many_arguments)]
fn assignment(
    pair: &PairDemand,
    course: &Course,
    room_id: RoomId,
    day: &str,
    start: u32,
    end: u32,
    duration: u32,
    assigned_students: Option<u32>,
) -> Assignment {
    Assignment {
        course_id: pair.course_id.clone(),
        instructor_id: course.instructor_id.clone(),
        division_id: pair.division_id.clone(),
        room_id,
        day: day.to_string(),
        start_minute: start,
        end_minute: end,
        duration_minutes: duration,
        is_split: assigned_students.is_some() && pair.is_split(),
        assigned_students,
    }
}

use hashbrown::{HashMap, HashSet};

use crate::dataset::{CourseId, DivisionId, RoomId, SchedulingDataSet};
use crate::ga::individual::{required_seats, Assignment};
use crate::timeutil;

/// Scores candidates by summing weighted constraint-violation penalties.
///
/// `score = violations + penalty / 1000`: the penalty term dominates ranking
/// precision, the integer violation tally is kept for coarse thresholds.
/// Zero means a fully valid, fully covered schedule.
pub struct FitnessEvaluator<'a> {
    data: &'a SchedulingDataSet,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(data: &'a SchedulingDataSet) -> Self {
        Self { data }
    }

    pub fn score(&self, individual: &[Assignment]) -> f64 {
        let data = self.data;
        let mut violations: u64 = 0;
        let mut penalty: u64 = 0;

        for (idx, a) in individual.iter().enumerate() {
            let course = data.course(&a.course_id);
            let room = data.room(&a.room_id);

            // session length must match the course requirement (5 min slack)
            if let Some(course) = course {
                let actual = timeutil::window_length(a.start_minute, a.end_minute);
                if actual.abs_diff(course.session_minutes()) > 5 {
                    violations += 10;
                    penalty += 100;
                }
            }

            if let Some(room) = room {
                // seat shortfall scales with the overflow
                let needed = required_seats(data, a);
                if room.capacity < needed {
                    let overflow = u64::from(needed - room.capacity);
                    violations += 100 + overflow;
                    penalty += 1000 + overflow * 10;
                }
                if course.is_some_and(|c| c.kind != room.kind) {
                    violations += 10;
                    penalty += 100;
                }
            }

            // availability only binds on days the instructor declared
            if let Some(windows) = data.availability_for(&a.instructor_id, &a.day) {
                let inside = windows
                    .iter()
                    .any(|&(ws, we)| timeutil::fits_in_window(a.start_minute, a.end_minute, ws, we));
                if !inside {
                    violations += 5;
                    penalty += 50;
                }
            }

            // mutual exclusion on room, instructor, and division
            if clashes(individual, idx, a, |o| o.room_id == a.room_id) {
                violations += 100;
                penalty += 1000;
            }
            if clashes(individual, idx, a, |o| o.instructor_id == a.instructor_id) {
                violations += 100;
                penalty += 1000;
            }
            if clashes(individual, idx, a, |o| o.division_id == a.division_id) {
                violations += 100;
                penalty += 1000;
            }
        }

        // coverage: every pair scheduled, every course on enough distinct days
        let mut scheduled_pairs: HashSet<(&CourseId, &DivisionId)> = HashSet::new();
        let mut course_days: HashMap<&CourseId, HashSet<&str>> = HashMap::new();
        for a in individual {
            scheduled_pairs.insert((&a.course_id, &a.division_id));
            course_days
                .entry(&a.course_id)
                .or_default()
                .insert(a.day.as_str());
        }
        for pair in data.pairs() {
            if !scheduled_pairs.contains(&(&pair.course_id, &pair.division_id)) {
                violations += 50;
                penalty += 500;
            }
            if let Some(course) = data.course(&pair.course_id) {
                let have = course_days.get(&pair.course_id).map_or(0, HashSet::len) as u64;
                let required = u64::from(course.days_per_week);
                if have < required {
                    let missing = required - have;
                    violations += 50 * missing;
                    penalty += 500 * missing;
                }
            }
        }

        // room/day overload: more than four sessions in one room on one day
        let mut load: HashMap<(&RoomId, &str), u64> = HashMap::new();
        for a in individual {
            *load.entry((&a.room_id, a.day.as_str())).or_insert(0) += 1;
        }
        for count in load.into_values() {
            if count > 4 {
                let excess = count - 4;
                violations += 100 * excess * excess;
                penalty += 1000 * excess * excess;
            }
        }

        violations as f64 + penalty as f64 / 1000.0
    }
}

/// Pairwise clash scan. Assignments of the same course-division pair never
/// clash with each other: parallel split sessions share day, time,
/// instructor, and division by construction.
fn clashes<F>(individual: &[Assignment], idx: usize, a: &Assignment, same_resource: F) -> bool
where
    F: Fn(&Assignment) -> bool,
{
    individual.iter().enumerate().any(|(j, other)| {
        j != idx
            && other.day == a.day
            && !(other.course_id == a.course_id && other.division_id == a.division_id)
            && timeutil::overlaps(a.start_minute, a.end_minute, other.start_minute, other.end_minute)
            && same_resource(other)
    })
}

use hashbrown::HashMap;
use serde::Serialize;

use crate::error::SchedulerError;
use crate::models::SessionRecord;
use crate::timeutil::{overlaps, parse_clock};

/// Two sessions claiming the same resource at an overlapping time.
#[derive(Debug, Clone, Serialize)]
pub struct BookingConflict {
    pub resource: String,
    pub day: String,
    pub course_a: String,
    pub course_b: String,
    pub time_a: String,
    pub time_b: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CapacityOverflow {
    pub room_name: String,
    pub room_capacity: u32,
    pub student_count: u32,
    pub overflow: u32,
    pub course_name: String,
    pub day: String,
}

#[derive(Debug, Default, Serialize)]
pub struct DiagnosticReport {
    pub room_conflicts: Vec<BookingConflict>,
    pub instructor_conflicts: Vec<BookingConflict>,
    pub division_conflicts: Vec<BookingConflict>,
    pub capacity_overflows: Vec<CapacityOverflow>,
}

impl DiagnosticReport {
    pub fn total_conflicts(&self) -> usize {
        self.room_conflicts.len()
            + self.instructor_conflicts.len()
            + self.division_conflicts.len()
            + self.capacity_overflows.len()
    }

    pub fn is_clean(&self) -> bool {
        self.total_conflicts() == 0
    }
}

/// Read-only audit of an exported schedule. Consumes only the output
/// contract, so it can verify schedules produced by any run, not just the
/// current one.
pub struct ScheduleChecker;

impl ScheduleChecker {
    pub fn analyze(sessions: &[SessionRecord]) -> Result<DiagnosticReport, SchedulerError> {
        // parse every clock up front so one bad record fails loudly instead
        // of poisoning the pairwise scans
        let times: Vec<(u32, u32)> = sessions
            .iter()
            .map(|s| Ok((parse_clock(&s.start_time)?, parse_clock(&s.end_time)?)))
            .collect::<Result<_, SchedulerError>>()?;

        let mut report = DiagnosticReport {
            room_conflicts: double_bookings(sessions, &times, |s| &s.room_name, false),
            instructor_conflicts: double_bookings(sessions, &times, |s| &s.instructor_name, false),
            // parallel sessions of one split pair share the division by
            // design; identical course names mark them as deliberate
            division_conflicts: double_bookings(sessions, &times, |s| &s.group_label, true),
            capacity_overflows: Vec::new(),
        };

        for s in sessions {
            if s.offline_student_count > s.room_capacity {
                report.capacity_overflows.push(CapacityOverflow {
                    room_name: s.room_name.clone(),
                    room_capacity: s.room_capacity,
                    student_count: s.offline_student_count,
                    overflow: s.offline_student_count - s.room_capacity,
                    course_name: s.course_name.clone(),
                    day: s.day.clone(),
                });
            }
        }

        Ok(report)
    }
}

fn double_bookings<'a, F>(
    sessions: &'a [SessionRecord],
    times: &[(u32, u32)],
    key: F,
    skip_same_course: bool,
) -> Vec<BookingConflict>
where
    F: Fn(&'a SessionRecord) -> &'a str,
{
    let mut groups: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    for (i, s) in sessions.iter().enumerate() {
        groups.entry((s.day.as_str(), key(s))).or_default().push(i);
    }

    // stable report order regardless of hash iteration
    let mut entries: Vec<((&str, &str), Vec<usize>)> = groups.into_iter().collect();
    entries.sort();

    let mut found = Vec::new();
    for ((day, resource), indices) in entries {
        for (pos, &i) in indices.iter().enumerate() {
            for &j in &indices[pos + 1..] {
                let (s1, s2) = (&sessions[i], &sessions[j]);
                if skip_same_course && s1.course_name == s2.course_name {
                    continue;
                }
                let ((start1, end1), (start2, end2)) = (times[i], times[j]);
                if overlaps(start1, end1, start2, end2) {
                    found.push(BookingConflict {
                        resource: resource.to_string(),
                        day: day.to_string(),
                        course_a: s1.course_name.clone(),
                        course_b: s2.course_name.clone(),
                        time_a: format!("{} - {}", s1.start_time, s1.end_time),
                        time_b: format!("{} - {}", s2.start_time, s2.end_time),
                    });
                }
            }
        }
    }
    found
}

pub mod fitness;
pub mod individual;
pub mod optimizer;
pub mod repair;

use crate::dataset::SchedulingDataSet;
use crate::models::SessionRecord;
use crate::timeutil::minutes_to_clock12;

use self::individual::Individual;

/// Renders the final schedule into exported session records. Assignments
/// whose references no longer resolve are skipped; the data set warned about
/// them at load time.
pub fn format_schedule(schedule: &Individual, data: &SchedulingDataSet) -> Vec<SessionRecord> {
    schedule
        .iter()
        .filter_map(|a| {
            let course = data.course(&a.course_id)?;
            let division = data.division(&a.division_id)?;
            let room = data.room(&a.room_id)?;
            let instructor_name = data
                .instructor_name(&a.instructor_id)
                .unwrap_or(&a.instructor_id.0);
            let offline = a.assigned_students.unwrap_or_else(|| {
                data.pair_demand(&a.course_id)
                    .map(|p| p.effective_students)
                    .unwrap_or(division.student_count)
            });
            Some(SessionRecord {
                day: a.day.clone(),
                course_name: course.name.clone(),
                instructor_name: instructor_name.to_string(),
                offline_student_count: offline,
                total_student_count: division.student_count,
                room_name: room.name.clone(),
                room_capacity: room.capacity,
                group_label: division.id.to_string(),
                start_time: minutes_to_clock12(a.start_minute),
                end_time: minutes_to_clock12(a.end_minute),
                department: course.department.clone(),
                major: course.major.clone(),
                year: course.year,
            })
        })
        .collect()
}

//! Genetic-algorithm course scheduler.
//!
//! Assigns course sessions to (room, day, time-slot, instructor) tuples for
//! a set of academic divisions: a population-based search over candidate
//! timetables, a fitness function encoding constraint violations, and a
//! post-hoc conflict repair pass, behind a thin HTTP boundary.

pub mod checker;
pub mod dataset;
pub mod error;
pub mod ga;
pub mod handlers;
pub mod models;
pub mod timeutil;

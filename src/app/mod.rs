//! Stateful coordinators the front end drives

pub mod planner;
pub mod tracker;

pub use planner::Planner;
pub use tracker::ExpenseTracker;

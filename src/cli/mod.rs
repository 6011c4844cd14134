//! Terminal front end: argument types and table rendering for each command

pub mod calendar;
pub mod data;
pub mod expense;
pub mod rates;
pub mod report;
pub mod setup;
pub mod todo;
pub mod ui;

pub mod calendar;
pub mod config;
pub mod dates;
pub mod entry;
pub mod month_log;
pub mod paths;
pub mod recorder;
pub mod schedule;
pub mod source;
pub mod token;
pub mod undo;
pub mod util;
pub mod warn;

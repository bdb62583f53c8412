pub mod inbox;
pub mod schedule_csv;
pub mod workbook;

pub use inbox::{DirectoryInbox, MessageSource};
pub use schedule_csv::load_schedule;
pub use workbook::{read_grid, write_merged, write_mismatch_log};

//! Output module for end-of-run reporting

mod report;

pub use report::{format_summary, print_summary};

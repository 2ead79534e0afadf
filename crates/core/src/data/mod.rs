pub mod io;

pub use io::{field, parse_parent, CsvTable};

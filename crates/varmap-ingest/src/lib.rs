pub mod csv_table;
pub mod error;

pub use csv_table::{CsvTable, parse_csv_bytes, read_csv_reader, read_csv_table};
pub use error::{IngestError, Result};

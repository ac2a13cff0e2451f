//! Log readers: delimited fixed-arity records, grouped stats lines, and
//! protocol trace events.

pub mod csv_reader;
pub mod group_reader;
pub mod protocol;
pub mod records;

pub use csv_reader::{field_count, Numeric, RecordReader};
pub use group_reader::{read_groups, GroupReader};
pub use protocol::{read_events, EventKind, TraceEvent};

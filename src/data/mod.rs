//! Data module - table parsing, column resolution and processing

mod column;
mod loader;
mod processor;
mod table;

pub use column::{ColumnRef, ColumnResolver};
pub use loader::{RowLimit, Session, TableParser};
pub use processor::{
    CleaningPolicy, CleaningReport, DataProcessor, Fences, OutlierReport, TransformKind,
};
pub use table::{Cell, Table};

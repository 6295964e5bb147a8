pub mod index_snapshot;
pub mod table;

pub use index_snapshot::{Breadth, Constituent, IndexSnapshot};
pub use table::{render_table, CONSTITUENT_COLUMNS};

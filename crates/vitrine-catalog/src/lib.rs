pub mod combo;
pub mod schema;
pub mod seed;
pub mod store;

pub use combo::{filter_combo, ComboPolicy};
pub use seed::{bundled_fixture, NewProduct};
pub use store::SqliteCatalog;

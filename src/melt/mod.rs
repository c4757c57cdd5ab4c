//! Record flattening - reshape raw property records into relational tables
//!
//! Each raw record becomes one row of the parent `properties` table, and its
//! nested arrays are exploded into child rows that carry the parent's natural
//! key (`external_id`, the trimmed property title). Surrogate keys are only
//! assigned later, by the store.
//!
//! All tables are produced by one routine, [`project`], driven by the plans
//! in [`plan`].

pub mod coerce;
pub mod extractor;
pub mod plan;
pub mod types;
pub mod writer;

pub use coerce::{to_numeric, Coerce};
pub use extractor::{
    duplicate_keys, explode_array, flatten, natural_key, normalize_hoa, normalize_leads,
    normalize_properties, normalize_rehab, normalize_taxes, normalize_valuation, project,
};
pub use plan::{EntitySpec, RowFilter, RowSource};
pub use types::{Flattened, Row, Table, EXTERNAL_ID};
pub use writer::EntityWriter;

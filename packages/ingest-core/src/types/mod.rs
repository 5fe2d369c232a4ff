//! Data types for the ingestion engine.

pub mod category;
pub mod field;
pub mod record;

pub use category::{Category, CategoryMap};
pub use field::Field;
pub use record::{CandidateRecord, NormalizedRecord, PageContext, Venue, VenueFields};

//! Site profiles for the ingestion engine.
//!
//! Each site contributes a [`RunConfig`](ingest_core::RunConfig)
//! profile (selectors, state locator, page addressing, pacing) plus an
//! [`EmbeddedSchema`](ingest_core::EmbeddedSchema) describing its
//! embedded state blob. Everything behavioral lives in `ingest-core`;
//! this crate is data and shape knowledge only.

pub mod eventbrite;
pub mod identity;
pub mod meetup;

pub use eventbrite::EventbriteSchema;
pub use meetup::MeetupSchema;

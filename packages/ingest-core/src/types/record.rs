//! Record types: raw candidates, related entities, and normalized output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::field::Field;

/// Per-navigation context for one listing page.
///
/// `total_pages` defaults to 1 until pagination metadata is read from
/// the page; once read it is fixed for the category's remaining
/// iterations.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// Category being crawled.
    pub category: Category,

    /// 1-based page number, strictly increasing within a category.
    pub page_number: u32,

    /// Total pages reported by the site, at least 1.
    pub total_pages: u32,
}

impl PageContext {
    /// Context for the first page of a category.
    pub fn first(category: Category) -> Self {
        Self {
            category,
            page_number: 1,
            total_pages: 1,
        }
    }
}

/// Raw extraction result for one listing item, before deduplication.
///
/// `id` and `link` are required; everything else carries the
/// [`Field`] sentinel when the producing strategy could not populate it.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateRecord {
    /// Stable identifier for the physical record.
    pub id: String,

    /// Canonical link to the record's detail page.
    pub link: String,

    /// Record title.
    pub title: Field<String>,

    /// Record description.
    pub description: Field<String>,

    /// Raw date/time string as the site publishes it.
    pub date_time_raw: Field<String>,

    /// Attendee count, when the site exposes one.
    pub attendees_count: Field<u64>,

    /// Weak reference to a related entity parsed from the same page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_ref: Option<String>,
}

impl CandidateRecord {
    /// Create a candidate with all optional fields unavailable.
    pub fn new(id: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            link: link.into(),
            title: Field::Unavailable,
            description: Field::Unavailable,
            date_time_raw: Field::Unavailable,
            attendees_count: Field::Unavailable,
            venue_ref: None,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Field::present(title.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Field::present(description.into());
        self
    }

    /// Set the raw date/time string.
    pub fn with_date_time_raw(mut self, date_time: impl Into<String>) -> Self {
        self.date_time_raw = Field::present(date_time.into());
        self
    }

    /// Set the attendee count.
    pub fn with_attendees_count(mut self, count: u64) -> Self {
        self.attendees_count = Field::present(count);
        self
    }

    /// Set the related-entity reference.
    pub fn with_venue_ref(mut self, venue_ref: impl Into<String>) -> Self {
        self.venue_ref = Some(venue_ref.into());
        self
    }
}

/// A related entity (venue) parsed from a page's embedded state.
///
/// Scoped to the page in which it was parsed; candidates refer to it
/// by id only and never own it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Venue {
    /// Venue identifier as published by the site.
    pub id: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Flattened venue projection carried on every normalized record.
#[derive(Debug, Clone, Serialize)]
pub struct VenueFields {
    pub venue_name: Field<String>,
    pub address: Field<String>,
    pub city: Field<String>,
    pub state: Field<String>,
    pub country: Field<String>,
    pub latitude: Field<f64>,
    pub longitude: Field<f64>,
}

impl VenueFields {
    /// All fields set to the unavailable sentinel.
    pub fn unavailable() -> Self {
        Self {
            venue_name: Field::Unavailable,
            address: Field::Unavailable,
            city: Field::Unavailable,
            state: Field::Unavailable,
            country: Field::Unavailable,
            latitude: Field::Unavailable,
            longitude: Field::Unavailable,
        }
    }
}

impl From<&Venue> for VenueFields {
    fn from(venue: &Venue) -> Self {
        Self {
            venue_name: venue.name.clone().into(),
            address: venue.address.clone().into(),
            city: venue.city.clone().into(),
            state: venue.state.clone().into(),
            country: venue.country.clone().into(),
            latitude: venue.lat.into(),
            longitude: venue.lon.into(),
        }
    }
}

/// Canonical output record, immutable once accepted by the deduplicator.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedRecord {
    /// Site the record was ingested from.
    pub source: String,

    /// Category in which the record was first seen.
    pub category: String,

    /// Stable record identifier.
    pub id: String,

    /// Canonical link.
    pub link: String,

    pub title: Field<String>,
    pub description: Field<String>,
    pub date_time_raw: Field<String>,
    pub attendees_count: Field<u64>,

    /// Venue enrichment, unavailable when the reference was missing.
    #[serde(flatten)]
    pub venue: VenueFields,

    /// When this record was extracted.
    pub scraped_at: DateTime<Utc>,
}

impl NormalizedRecord {
    /// Build the canonical record from a candidate and its page context.
    pub fn from_candidate(
        source: &str,
        category: &str,
        candidate: CandidateRecord,
        venue: VenueFields,
    ) -> Self {
        Self {
            source: source.to_string(),
            category: category.to_string(),
            id: candidate.id,
            link: candidate.link,
            title: candidate.title,
            description: candidate.description,
            date_time_raw: candidate.date_time_raw,
            attendees_count: candidate.attendees_count,
            venue,
            scraped_at: Utc::now(),
        }
    }
}

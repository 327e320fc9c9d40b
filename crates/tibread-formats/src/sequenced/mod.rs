//! Records, listings, record indexes and footers of dialect B
//!
//! Record offsets inside a volume are relative to the end of its header;
//! offsets stored in listings, indexes, footers and trailers are
//! archive-relative.

pub mod config;
mod error;
pub mod footer;
pub mod index;
pub mod listing;
pub mod record;

pub use config::{ConfigAttribute, parse_config};
pub use error::{SequencedError, SequencedResult};
pub use footer::{FOOTER_LEN, SliceForm, SliceTrailer, VolumeFooter};
pub use index::{RECORD_INDEX_MAGIC, RecordHandle, RecordIndex};
pub use listing::{ATTRIBUTE_DIRECTORY, ListingEntry, parse_listing};
pub use record::{Record, RecordBody, RecordType};

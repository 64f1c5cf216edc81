//! Source side of the migration: paginated DynamoDB scans.
//!
//! - [`dynamo`]: `Scan`-backed [`PageSource`](crate::core::PageSource) and item unmarshalling
//! - [`paged`]: [`PagedReader`], the record-at-a-time view over any page source

pub mod dynamo;
pub mod paged;

pub use dynamo::{dynamo_client, item_to_record, DynamoScanSource};
pub use paged::PagedReader;

//! On-disk byte formats
//!
//! Serialization of reconciled pages lives here, separate from the logic
//! that decides when to reconcile and how pages are materialized again.
//!
//! # Module Structure
//!
//! - `page`: reconciled page header, entry encoding and file naming

pub mod page;

pub use page::{
    decode_page, encode_page, find_latest_page, page_path, payload_tags, PageHeader,
    PageHeaderError, PAGE_FORMAT_VERSION, PAGE_HEADER_SIZE, PAGE_MAGIC,
};

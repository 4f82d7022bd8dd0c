//! Page layout model consumed from the text extraction collaborator.
//!
//! The pipeline never parses PDF content itself; it starts from a
//! blocks → lines → spans → characters tree per page.

pub mod page_layout;

// Re-export main types
pub use page_layout::{
    InMemoryLayout, LayoutBlock, LayoutChar, LayoutLine, LayoutSource, LayoutSpan, PageLayout,
};

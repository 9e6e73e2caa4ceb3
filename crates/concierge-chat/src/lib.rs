//! Conversation engine for the Concierge FAQ widget.
//!
//! Provides knowledge-base loading, keyword-containment response resolution,
//! the append-only conversation timeline, and the widget controller state
//! machine that orchestrates them.

pub mod controller;
pub mod error;
pub mod knowledge;
pub mod resolver;
pub mod timeline;

pub use controller::{WidgetController, WidgetState};
pub use error::ChatError;
pub use resolver::{resolve, STILL_LOADING_RESPONSE};
pub use timeline::Timeline;

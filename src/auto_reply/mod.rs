//! Auto-reply: a system message appended some time after each user message,
//! with its content fetched from an external quote service.

pub mod quote;
pub mod scheduler;

pub use quote::{HttpQuoteSource, QuoteError, QuoteSource, StaticQuoteSource, DEFAULT_QUOTE_API_URL};
pub use scheduler::{AutoReplyError, AutoReplyScheduler, DEFAULT_AUTO_REPLY_DELAY};

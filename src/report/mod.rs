//! Reporting: the buy/wait recommendation and formatted terminal output.

pub mod format;
pub mod recommend;

pub use format::{NO_HISTORY_MESSAGE, format_recommendation, format_report, format_span_table};
pub use recommend::{recommend, recommendation_text, tier_for_diff};

//! Search query composition.
//!
//! - [`criteria`] - The [`Criteria`] query abstraction and SQL fragments
//! - [`handlers`] - Column-level SQL for each parameter type
//! - [`composer`] - Builds criteria from search parameter sets

pub mod composer;
pub mod criteria;
pub mod handlers;

pub use composer::{allergy_criteria, condition_criteria};
pub use criteria::{Criteria, Join, JoinType, SqlFragment, SqlParam};

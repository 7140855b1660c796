//! Seasonal price resolution
//!
//! - **resolver**: pure per-night rate selection and segment folding

pub mod resolver;

pub use resolver::{
    min_stay_violation, resolve_with_rules, MinStayViolation, PriceBreakdown, PricingError,
};

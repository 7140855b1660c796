//! Core configuration
//!
//! # Environment variables
//!
//! All settings can be overridden through environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | DATA_DIR | /var/lib/booking/core | Directory holding the redb database |
//! | BUSINESS_TIMEZONE | Europe/Madrid | Timezone for day boundaries (check-in gate, purges) |
//! | CURRENCY | EUR | ISO 4217 currency for new payment intents |
//! | MIN_STAY_ENFORCEMENT | per_segment | `per_segment` or `whole_stay` |
//! | CANCEL_REFUND_POLICY | auto_request | `auto_request` or `manual` |
//! | INBOX_SWEEP_INTERVAL_SECS | 60 | Webhook inbox retry sweep period |
//!
//! # Example
//!
//! ```ignore
//! DATA_DIR=/data/booking BUSINESS_TIMEZONE=Europe/Lisbon cargo run
//! ```

use chrono_tz::Tz;

/// How minimum-stay constraints on seasonal rules are enforced
///
/// `PerSegment` (stricter, the default): every rule covering any night of the
/// stay must be satisfied by the full stay length. `WholeStay`: only the
/// largest `min_stay_nights` among covering rules is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinStayEnforcement {
    PerSegment,
    WholeStay,
}

/// Whether cancelling a paid booking creates the refund request itself
///
/// `AutoRequest` (default): the refund request row is written in the same
/// storage transaction as the cancellation. `Manual`: the cancellation only
/// records that a refund is owed; staff create the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationRefundPolicy {
    AutoRequest,
    Manual,
}

/// Core configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the redb database file
    pub data_dir: String,
    /// Business timezone for day-boundary decisions
    pub timezone: Tz,
    /// Currency for new payment intents
    pub currency: String,
    pub min_stay: MinStayEnforcement,
    pub cancel_refund: CancellationRefundPolicy,
    /// Webhook inbox sweep period (seconds)
    pub inbox_sweep_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to defaults.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let timezone = std::env::var("BUSINESS_TIMEZONE")
            .ok()
            .and_then(|tz| tz.parse::<Tz>().ok())
            .unwrap_or(chrono_tz::Europe::Madrid);

        let min_stay = match std::env::var("MIN_STAY_ENFORCEMENT").as_deref() {
            Ok("whole_stay") => MinStayEnforcement::WholeStay,
            _ => MinStayEnforcement::PerSegment,
        };

        let cancel_refund = match std::env::var("CANCEL_REFUND_POLICY").as_deref() {
            Ok("manual") => CancellationRefundPolicy::Manual,
            _ => CancellationRefundPolicy::AutoRequest,
        };

        Self {
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "/var/lib/booking/core".into()),
            timezone,
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "EUR".into()),
            min_stay,
            cancel_refund,
            inbox_sweep_interval_secs: std::env::var("INBOX_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "/var/lib/booking/core".into(),
            timezone: chrono_tz::Europe::Madrid,
            currency: "EUR".into(),
            min_stay: MinStayEnforcement::PerSegment,
            cancel_refund: CancellationRefundPolicy::AutoRequest,
            inbox_sweep_interval_secs: 60,
        }
    }
}

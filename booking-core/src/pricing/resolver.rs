//! Price resolver
//!
//! For each night of a stay the applicable rate is the most recently created
//! active rule covering that night; nights no rule covers fall back to the
//! room's base nightly rate. Consecutive nights at the same rate fold into
//! one segment. The resolution is a pure function of the rule set and base
//! rate: identical inputs yield identical breakdowns.

use crate::config::MinStayEnforcement;
use crate::money::{to_decimal, to_f64};
use crate::storage::StorageError;
use rust_decimal::Decimal;
use shared::booking::{RateSegment, StayDates};
use shared::models::{Room, SeasonalPricingRule};
use thiserror::Error;

/// Pricing errors
#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Room not found: {0}")]
    RoomNotFound(i64),

    /// Configuration error, not a booking error: the room has neither a
    /// base rate nor any rule covering the requested night.
    #[error("No applicable price for room {room_id} on {night}")]
    NoApplicablePrice {
        room_id: i64,
        night: chrono::NaiveDate,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Per-stay price breakdown
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakdown {
    pub room_id: i64,
    pub dates: StayDates,
    pub nights: i64,
    /// Ordered rate segments covering every night exactly once
    pub segments: Vec<RateSegment>,
    pub total: f64,
}

/// A stay too short for a covering rule's minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinStayViolation {
    pub rule_id: i64,
    pub rule_name: String,
    pub required_nights: i64,
    pub actual_nights: i64,
}

/// Resolve the price for a stay against an already-loaded rule set
///
/// `rules` may contain inactive or non-covering rows; they are filtered here
/// so callers can pass a room's full rule list.
pub fn resolve_with_rules(
    room: &Room,
    rules: &[SeasonalPricingRule],
    dates: &StayDates,
) -> Result<PriceBreakdown, PricingError> {
    let covering = covering_rules(rules, dates);

    let mut segments: Vec<RateSegment> = Vec::new();
    let mut total = Decimal::ZERO;

    for night in dates.iter_nights() {
        let (rule_id, rule_name, rate) = match winning_rule(&covering, night) {
            Some(rule) => (Some(rule.id), Some(rule.name.clone()), rule.nightly_price),
            None => {
                if !room.has_base_rate() {
                    return Err(PricingError::NoApplicablePrice {
                        room_id: room.id,
                        night,
                    });
                }
                (None, None, room.base_nightly_rate)
            }
        };

        total += to_decimal(rate);

        // Extend the open segment when the rate source is unchanged
        match segments.last_mut() {
            Some(seg) if seg.rule_id == rule_id && seg.nightly_rate == rate => {
                seg.nights += 1;
                seg.subtotal = to_f64(to_decimal(seg.nightly_rate) * Decimal::from(seg.nights));
            }
            _ => segments.push(RateSegment {
                rule_id,
                rule_name,
                nights: 1,
                nightly_rate: rate,
                subtotal: rate,
            }),
        }
    }

    Ok(PriceBreakdown {
        room_id: room.id,
        dates: *dates,
        nights: dates.nights(),
        segments,
        total: to_f64(total),
    })
}

/// Check the stay length against covering rules' minimum-stay constraints
///
/// `PerSegment`: every segment produced by a rule must itself span at least
/// the rule's minimum. `WholeStay`: the total stay length must satisfy the
/// largest minimum among covering rules.
pub fn min_stay_violation(
    breakdown: &PriceBreakdown,
    rules: &[SeasonalPricingRule],
    mode: MinStayEnforcement,
) -> Option<MinStayViolation> {
    let rule_by_id = |id: i64| rules.iter().find(|r| r.id == id);

    match mode {
        MinStayEnforcement::PerSegment => {
            for seg in &breakdown.segments {
                let Some(rule) = seg.rule_id.and_then(rule_by_id) else {
                    continue;
                };
                if let Some(min) = rule.min_stay_nights
                    && seg.nights < min as i64
                {
                    return Some(MinStayViolation {
                        rule_id: rule.id,
                        rule_name: rule.name.clone(),
                        required_nights: min as i64,
                        actual_nights: seg.nights,
                    });
                }
            }
            None
        }
        MinStayEnforcement::WholeStay => {
            let strictest = breakdown
                .segments
                .iter()
                .filter_map(|seg| seg.rule_id.and_then(rule_by_id))
                .filter_map(|rule| rule.min_stay_nights.map(|min| (rule, min)))
                .max_by_key(|(_, min)| *min)?;
            let (rule, min) = strictest;
            if breakdown.nights < min as i64 {
                return Some(MinStayViolation {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    required_nights: min as i64,
                    actual_nights: breakdown.nights,
                });
            }
            None
        }
    }
}

/// Active rules intersecting the stay's night range
fn covering_rules<'a>(
    rules: &'a [SeasonalPricingRule],
    dates: &StayDates,
) -> Vec<&'a SeasonalPricingRule> {
    let first_night = dates.check_in;
    let last_night = dates.check_out - chrono::Duration::days(1);
    rules
        .iter()
        .filter(|r| r.is_active && r.start_date <= last_night && r.end_date >= first_night)
        .collect()
}

/// Most recently created rule covering the night; ties break on rule id
fn winning_rule<'a>(
    covering: &[&'a SeasonalPricingRule],
    night: chrono::NaiveDate,
) -> Option<&'a SeasonalPricingRule> {
    covering
        .iter()
        .filter(|r| r.covers(night))
        .max_by_key(|r| (r.created_at, r.id))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_room(base_rate: f64) -> Room {
        Room {
            id: 1,
            business_id: 10,
            name: "Sea View".to_string(),
            base_nightly_rate: base_rate,
            base_hourly_rate: None,
            capacity: 4,
            status: shared::models::RoomStatus::Available,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn make_rule(
        id: i64,
        start: NaiveDate,
        end: NaiveDate,
        nightly: f64,
        created_at: i64,
    ) -> SeasonalPricingRule {
        SeasonalPricingRule {
            id,
            room_id: 1,
            name: format!("rule-{id}"),
            start_date: start,
            end_date: end,
            nightly_price: nightly,
            hourly_price: None,
            min_stay_nights: None,
            is_active: true,
            created_by: None,
            created_at,
        }
    }

    fn stay(ci: NaiveDate, co: NaiveDate) -> StayDates {
        StayDates::new(ci, co).unwrap()
    }

    #[test]
    fn test_base_rate_only() {
        let room = make_room(1000.0);
        let dates = stay(date(2025, 12, 24), date(2025, 12, 27));

        let breakdown = resolve_with_rules(&room, &[], &dates).unwrap();

        assert_eq!(breakdown.nights, 3);
        assert_eq!(breakdown.segments.len(), 1);
        assert_eq!(breakdown.segments[0].rule_id, None);
        assert_eq!(breakdown.total, 3000.0);
    }

    #[test]
    fn test_seasonal_rule_covers_whole_stay() {
        // Peak covers 2025-12-20..31 at 1500; stay 24..27 = 3 nights x 1500
        let room = make_room(1000.0);
        let peak = make_rule(7, date(2025, 12, 20), date(2025, 12, 31), 1500.0, 100);
        let dates = stay(date(2025, 12, 24), date(2025, 12, 27));

        let breakdown = resolve_with_rules(&room, &[peak], &dates).unwrap();

        assert_eq!(breakdown.segments.len(), 1);
        assert_eq!(breakdown.segments[0].rule_id, Some(7));
        assert_eq!(breakdown.segments[0].nights, 3);
        assert_eq!(breakdown.total, 4500.0);
    }

    #[test]
    fn test_partial_coverage_splits_segments() {
        // Rule covers only the first night; remaining two fall back to base
        let room = make_room(1000.0);
        let rule = make_rule(3, date(2025, 12, 20), date(2025, 12, 24), 1500.0, 100);
        let dates = stay(date(2025, 12, 24), date(2025, 12, 27));

        let breakdown = resolve_with_rules(&room, &[rule], &dates).unwrap();

        assert_eq!(breakdown.segments.len(), 2);
        assert_eq!(breakdown.segments[0].rule_id, Some(3));
        assert_eq!(breakdown.segments[0].nights, 1);
        assert_eq!(breakdown.segments[1].rule_id, None);
        assert_eq!(breakdown.segments[1].nights, 2);
        assert_eq!(breakdown.total, 1500.0 + 2000.0);
    }

    #[test]
    fn test_latest_created_rule_wins_overlap() {
        let room = make_room(1000.0);
        let older = make_rule(1, date(2025, 12, 1), date(2025, 12, 31), 1200.0, 100);
        let newer = make_rule(2, date(2025, 12, 20), date(2025, 12, 26), 1800.0, 200);
        let dates = stay(date(2025, 12, 24), date(2025, 12, 26));

        let breakdown = resolve_with_rules(&room, &[older, newer], &dates).unwrap();

        // Both nights (24, 25) covered by both rules; the newer one wins
        assert_eq!(breakdown.segments.len(), 1);
        assert_eq!(breakdown.segments[0].rule_id, Some(2));
        assert_eq!(breakdown.total, 3600.0);
    }

    #[test]
    fn test_inactive_rule_ignored() {
        let room = make_room(1000.0);
        let mut rule = make_rule(1, date(2025, 12, 1), date(2025, 12, 31), 1500.0, 100);
        rule.is_active = false;
        let dates = stay(date(2025, 12, 24), date(2025, 12, 26));

        let breakdown = resolve_with_rules(&room, &[rule], &dates).unwrap();

        assert_eq!(breakdown.segments[0].rule_id, None);
        assert_eq!(breakdown.total, 2000.0);
    }

    #[test]
    fn test_no_applicable_price_is_config_error() {
        let room = make_room(0.0);
        let dates = stay(date(2025, 12, 24), date(2025, 12, 26));

        let result = resolve_with_rules(&room, &[], &dates);

        assert!(matches!(
            result,
            Err(PricingError::NoApplicablePrice { room_id: 1, .. })
        ));
    }

    #[test]
    fn test_rule_covering_all_nights_rescues_zero_base_rate() {
        let room = make_room(0.0);
        let rule = make_rule(1, date(2025, 12, 1), date(2025, 12, 31), 900.0, 100);
        let dates = stay(date(2025, 12, 24), date(2025, 12, 26));

        let breakdown = resolve_with_rules(&room, &[rule], &dates).unwrap();
        assert_eq!(breakdown.total, 1800.0);
    }

    #[test]
    fn test_determinism() {
        let room = make_room(1000.0);
        let rules = vec![
            make_rule(1, date(2025, 12, 1), date(2025, 12, 31), 1200.0, 100),
            make_rule(2, date(2025, 12, 20), date(2025, 12, 26), 1800.0, 200),
        ];
        let dates = stay(date(2025, 12, 22), date(2025, 12, 29));

        let a = resolve_with_rules(&room, &rules, &dates).unwrap();
        let b = resolve_with_rules(&room, &rules, &dates).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_min_stay_per_segment_violation() {
        let room = make_room(1000.0);
        let mut rule = make_rule(5, date(2025, 12, 26), date(2025, 12, 31), 1500.0, 100);
        rule.min_stay_nights = Some(3);
        // 5-night stay, but only the last night falls inside the rule
        let dates = stay(date(2025, 12, 22), date(2025, 12, 27));
        let rules = vec![rule];

        let breakdown = resolve_with_rules(&room, &rules, &dates).unwrap();

        let violation =
            min_stay_violation(&breakdown, &rules, MinStayEnforcement::PerSegment).unwrap();
        assert_eq!(violation.rule_id, 5);
        assert_eq!(violation.required_nights, 3);
        assert_eq!(violation.actual_nights, 1);

        // Whole-stay mode accepts: total 5 nights >= 3
        assert!(min_stay_violation(&breakdown, &rules, MinStayEnforcement::WholeStay).is_none());
    }

    #[test]
    fn test_min_stay_whole_stay_violation() {
        let room = make_room(1000.0);
        let mut rule = make_rule(5, date(2025, 12, 1), date(2025, 12, 31), 1500.0, 100);
        rule.min_stay_nights = Some(4);
        let dates = stay(date(2025, 12, 24), date(2025, 12, 26));
        let rules = vec![rule];

        let breakdown = resolve_with_rules(&room, &rules, &dates).unwrap();

        // Both modes reject a 2-night stay fully inside a min-4 rule
        assert!(
            min_stay_violation(&breakdown, &rules, MinStayEnforcement::PerSegment).is_some()
        );
        assert!(min_stay_violation(&breakdown, &rules, MinStayEnforcement::WholeStay).is_some());
    }
}

//! Derived business metrics: pure ratio functions over already-aggregated
//! counts. Every zero denominator yields zero, never an error or NaN.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};

use shoppulse_core::types::{OrderRecord, TrackedEvent};

/// Orders per hundred page visits.
pub fn conversion_rate(orders: u64, page_visits: u64) -> f64 {
    if page_visits == 0 {
        return 0.0;
    }
    orders as f64 / page_visits as f64 * 100.0
}

pub fn avg_order_value(total_revenue: f64, order_count: u64) -> f64 {
    if order_count == 0 {
        return 0.0;
    }
    total_revenue / order_count as f64
}

pub fn customer_lifetime_value(total_revenue: f64, user_count: u64) -> f64 {
    if user_count == 0 {
        return 0.0;
    }
    total_revenue / user_count as f64
}

/// Share of the customer population with at least two orders.
pub fn retention_rate(repeat_customers: u64, user_count: u64) -> f64 {
    if user_count == 0 {
        return 0.0;
    }
    repeat_customers as f64 / user_count as f64 * 100.0
}

/// Share of sessions that saw exactly one page visit.
pub fn bounce_rate(bounced_sessions: u64, total_sessions: u64) -> f64 {
    if total_sessions == 0 {
        return 0.0;
    }
    bounced_sessions as f64 / total_sessions as f64 * 100.0
}

/// Percentage change from `previous` to `current`. A zero baseline maps
/// to 100 when anything appeared and 0 otherwise.
pub fn growth(current: f64, previous: f64) -> f64 {
    if previous != 0.0 {
        (current - previous) / previous * 100.0
    } else if current > 0.0 {
        100.0
    } else {
        0.0
    }
}

/// Customers with two or more orders in the snapshot.
pub fn repeat_customer_count(orders: &[OrderRecord]) -> u64 {
    let mut per_user: HashMap<&str, u64> = HashMap::new();
    for order in orders {
        if order.user_id.is_empty() {
            continue;
        }
        *per_user.entry(order.user_id.as_str()).or_insert(0) += 1;
    }
    per_user.values().filter(|&&count| count >= 2).count() as u64
}

/// `(bounced, total)` session counts over a page-visit snapshot.
pub fn session_bounce_counts(page_visits: &[TrackedEvent]) -> (u64, u64) {
    let mut per_session: HashMap<&str, u64> = HashMap::new();
    for event in page_visits {
        if event.session_id.is_empty() {
            continue;
        }
        *per_session.entry(event.session_id.as_str()).or_insert(0) += 1;
    }
    let total = per_session.len() as u64;
    let bounced = per_session.values().filter(|&&count| count == 1).count() as u64;
    (bounced, total)
}

/// Current vs previous calendar month, keyed by `(year, month)` so a
/// January is compared against the December that actually preceded it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyGrowth {
    pub current_revenue: f64,
    pub previous_revenue: f64,
    pub current_orders: u64,
    pub previous_orders: u64,
    pub revenue_growth_pct: f64,
    pub order_growth_pct: f64,
}

pub fn month_over_month(orders: &[OrderRecord], now: DateTime<Utc>) -> MonthlyGrowth {
    let current_key = (now.year(), now.month());
    let previous_key = if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    };

    let mut summary = MonthlyGrowth::default();
    for order in orders {
        let key = (order.created_at.year(), order.created_at.month());
        if key == current_key {
            summary.current_revenue += order.total;
            summary.current_orders += 1;
        } else if key == previous_key {
            summary.previous_revenue += order.total;
            summary.previous_orders += 1;
        }
    }

    summary.revenue_growth_pct = growth(summary.current_revenue, summary.previous_revenue);
    summary.order_growth_pct = growth(summary.current_orders as f64, summary.previous_orders as f64);
    summary
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shoppulse_core::types::{EventKind, UNKNOWN};
    use uuid::Uuid;

    fn order(user_id: &str, total: f64, at: DateTime<Utc>) -> OrderRecord {
        OrderRecord {
            order_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            total,
            created_at: at,
        }
    }

    fn visit(session_id: &str) -> TrackedEvent {
        TrackedEvent {
            event_id: Uuid::new_v4(),
            kind: EventKind::PageVisit,
            subject: "/".into(),
            session_id: session_id.into(),
            user_id: None,
            occurred_at: Utc::now(),
            network_origin: UNKNOWN.into(),
            location: UNKNOWN.into(),
            agent_string: "test".into(),
            referrer: None,
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_growth_edge_cases() {
        assert_eq!(growth(0.0, 0.0), 0.0);
        assert_eq!(growth(5.0, 0.0), 100.0);
        assert_eq!(growth(50.0, 100.0), -50.0);
        assert_eq!(growth(150.0, 100.0), 50.0);
    }

    #[test]
    fn test_ratios_guard_zero_denominators() {
        assert_eq!(conversion_rate(10, 0), 0.0);
        assert_eq!(avg_order_value(100.0, 0), 0.0);
        assert_eq!(customer_lifetime_value(100.0, 0), 0.0);
        assert_eq!(retention_rate(3, 0), 0.0);
        assert_eq!(bounce_rate(3, 0), 0.0);
    }

    #[test]
    fn test_conversion_and_retention() {
        assert_eq!(conversion_rate(3, 100), 3.0);
        assert_eq!(avg_order_value(250.0, 5), 50.0);
        assert_eq!(customer_lifetime_value(300.0, 10), 30.0);
        assert_eq!(retention_rate(2, 8), 25.0);
    }

    #[test]
    fn test_repeat_customers() {
        let now = Utc::now();
        let orders = vec![
            order("u-1", 10.0, now),
            order("u-1", 20.0, now),
            order("u-2", 15.0, now),
            order("u-3", 5.0, now),
            order("u-3", 5.0, now),
            order("u-3", 5.0, now),
        ];
        assert_eq!(repeat_customer_count(&orders), 2);
    }

    #[test]
    fn test_bounce_counts() {
        let visits = vec![
            visit("sess-a"),
            visit("sess-a"),
            visit("sess-b"),
            visit("sess-c"),
        ];
        let (bounced, total) = session_bounce_counts(&visits);
        assert_eq!(total, 3);
        assert_eq!(bounced, 2);
        assert_eq!(bounce_rate(bounced, total), 2.0 / 3.0 * 100.0);
    }

    #[test]
    fn test_month_over_month_is_year_aware() {
        // January compares against the December that preceded it; an order
        // from the same month of the previous year stays out of both sides.
        let orders = vec![
            order("u-1", 50.0, at(2024, 1, 10)),
            order("u-2", 100.0, at(2023, 12, 20)),
            order("u-3", 999.0, at(2023, 1, 15)),
        ];

        let summary = month_over_month(&orders, at(2024, 1, 15));
        assert_eq!(summary.current_revenue, 50.0);
        assert_eq!(summary.previous_revenue, 100.0);
        assert_eq!(summary.current_orders, 1);
        assert_eq!(summary.previous_orders, 1);
        assert_eq!(summary.revenue_growth_pct, -50.0);
        assert_eq!(summary.order_growth_pct, 0.0);
    }

    #[test]
    fn test_month_over_month_mid_year() {
        let orders = vec![
            order("u-1", 80.0, at(2024, 6, 3)),
            order("u-1", 40.0, at(2024, 6, 20)),
            order("u-2", 60.0, at(2024, 5, 9)),
            order("u-2", 10.0, at(2024, 3, 1)),
        ];

        let summary = month_over_month(&orders, at(2024, 6, 25));
        assert_eq!(summary.current_revenue, 120.0);
        assert_eq!(summary.previous_revenue, 60.0);
        assert_eq!(summary.revenue_growth_pct, 100.0);
        assert_eq!(summary.order_growth_pct, 100.0);
    }

    #[test]
    fn test_month_over_month_empty_baseline() {
        let orders = vec![order("u-1", 25.0, at(2024, 6, 3))];
        let summary = month_over_month(&orders, at(2024, 6, 25));
        assert_eq!(summary.revenue_growth_pct, 100.0);

        let summary = month_over_month(&[], at(2024, 6, 25));
        assert_eq!(summary.revenue_growth_pct, 0.0);
        assert_eq!(summary.order_growth_pct, 0.0);
    }
}

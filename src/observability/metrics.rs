//! Metrics collection.
//!
//! # Metrics
//! - `zone_timeout_expired_total` (counter): deadlines that cancelled work, by kind
//! - `zone_timeout_refused_total` (counter): entries refused by a timed-out zone
//! - `zone_timeout_freezes_total` (counter): freezes entered, by scope
//! - `zone_timeout_live_zones` (gauge): zones currently in the manager's map
//!
//! # Design Decisions
//! - Uses the `metrics` facade; the embedding application installs a recorder
//! - Without a recorder every call is a no-op

/// Record a deadline that cancelled work. `kind` is "zone" or "global".
pub fn record_expired(kind: &'static str) {
    ::metrics::counter!("zone_timeout_expired_total", "kind" => kind).increment(1);
}

/// Record an entry refused because the zone already timed out.
pub fn record_refused() {
    ::metrics::counter!("zone_timeout_refused_total").increment(1);
}

/// Record a freeze. `scope` is "zone" or "global".
pub fn record_freeze(scope: &'static str) {
    ::metrics::counter!("zone_timeout_freezes_total", "scope" => scope).increment(1);
}

/// Update the number of live zones.
pub fn record_live_zones(count: usize) {
    ::metrics::gauge!("zone_timeout_live_zones").set(count as f64);
}

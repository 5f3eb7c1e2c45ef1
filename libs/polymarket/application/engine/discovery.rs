//! Resolves a scheduler boundary to a tradeable market.
//!
//! The scheduler works purely in wall-clock terms (§4.1); it still needs to
//! know which Gamma market corresponds to a given `(timeframe, open_ts)` so
//! it can route an order to the right token ids. This wraps `GammaClient`
//! with the slug/close-time matching the "Up or Down" markets use, grounded
//! in the same paginated-fetch client the rest of the infra layer already
//! uses for market metadata.

use crate::domain::errors::DataQualityError;
use crate::domain::types::Timeframe;
use crate::infrastructure::client::gamma::client::GammaError;
use crate::infrastructure::client::gamma::{GammaClient, GammaMarket};
use chrono::{DateTime, Utc};
use tracing::debug;

/// A market resolved to the fields the scheduler actually needs beyond its
/// own window bookkeeping: the token ids to trade.
#[derive(Debug, Clone)]
pub struct ResolvedMarket {
    pub market_id: String,
    pub yes_token_id: String,
    pub no_token_id: String,
    pub resolves_at: DateTime<Utc>,
}

fn no_market() -> DataQualityError {
    DataQualityError::InsufficientHistory { have: 0, need: 1 }
}

/// Gamma lists a market's slug but no close-time-indexed lookup; matches on
/// slug substring (asset + "up-or-down") and a 90s tolerance against
/// `end_date_iso`, since clock skew between discovery and the scheduler's
/// own UTC read can shift the boundary by a few seconds.
fn slug_matches(slug: Option<&str>, asset_slug: &str) -> bool {
    slug.map(|s| s.contains(asset_slug) && s.contains("up-or-down")).unwrap_or(false)
}

fn close_matches(end_date_iso: Option<&str>, close_ts: DateTime<Utc>) -> bool {
    match end_date_iso.and_then(|s| DateTime::parse_from_rfc3339(s).ok()) {
        Some(dt) => (dt.with_timezone(&Utc) - close_ts).num_seconds().abs() <= 90,
        None => false,
    }
}

/// Parses Gamma's JSON-string-encoded `clob_token_ids` array. Polymarket
/// lists outcome token ids in the same order as `outcomes` (conventionally
/// `["Up", "Down"]` for these markets); index 0 is Yes.
fn parse_token_ids(raw: &str) -> Option<(String, String)> {
    let ids: Vec<String> = serde_json::from_str(raw).ok()?;
    match ids.as_slice() {
        [yes, no] => Some((yes.clone(), no.clone())),
        _ => None,
    }
}

pub struct MarketDiscovery {
    gamma: GammaClient,
    asset_slug: String,
}

impl MarketDiscovery {
    pub fn new(gamma: GammaClient, asset_slug: impl Into<String>) -> Self {
        Self { gamma, asset_slug: asset_slug.into() }
    }

    /// Finds the "Up or Down" market whose window opens at `open_ts` for the
    /// given timeframe.
    pub async fn find_window_market(
        &self,
        timeframe: Timeframe,
        open_ts: DateTime<Utc>,
    ) -> Result<ResolvedMarket, DataQualityError> {
        let close_ts = open_ts + chrono::Duration::minutes(timeframe.minutes());
        let markets = self.gamma.get_all_active_markets().await.map_err(|e: GammaError| {
            debug!(error = %e, "discovery: gamma fetch failed");
            no_market()
        })?;

        let candidate = markets.into_iter().find(|m| {
            slug_matches(m.slug.as_deref(), &self.asset_slug)
                && close_matches(m.end_date_iso.as_deref(), close_ts)
        });

        match candidate {
            Some(m) => Self::resolve(m),
            None => {
                debug!(timeframe = %timeframe, open_ts = %open_ts, "discovery: no matching market");
                Err(no_market())
            }
        }
    }

    fn resolve(m: GammaMarket) -> Result<ResolvedMarket, DataQualityError> {
        let market_id = m.condition_id.or(m.id).ok_or_else(no_market)?;
        let raw_ids = m.clob_token_ids.ok_or_else(no_market)?;
        let (yes_token_id, no_token_id) = parse_token_ids(&raw_ids).ok_or_else(no_market)?;
        let resolves_at = m
            .end_date_iso
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(ResolvedMarket { market_id, yes_token_id, no_token_id, resolves_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_match_requires_asset_and_up_or_down() {
        assert!(slug_matches(Some("bitcoin-up-or-down-july-28-4pm-et"), "bitcoin"));
        assert!(!slug_matches(Some("ethereum-up-or-down-july-28-4pm-et"), "bitcoin"));
        assert!(!slug_matches(None, "bitcoin"));
    }

    #[test]
    fn close_time_tolerance_accepts_small_skew_rejects_large() {
        let close_ts = DateTime::parse_from_rfc3339("2026-07-28T20:00:00Z").unwrap().with_timezone(&Utc);
        assert!(close_matches(Some("2026-07-28T20:00:45Z"), close_ts));
        assert!(!close_matches(Some("2026-07-28T20:05:00Z"), close_ts));
        assert!(!close_matches(None, close_ts));
    }

    #[test]
    fn parse_token_ids_requires_exactly_two() {
        assert_eq!(
            parse_token_ids(r#"["yes-id","no-id"]"#),
            Some(("yes-id".to_string(), "no-id".to_string()))
        );
        assert_eq!(parse_token_ids(r#"["only-one"]"#), None);
        assert_eq!(parse_token_ids("not json"), None);
    }
}

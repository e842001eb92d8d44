use std::collections::BTreeMap;

use crate::error::{AppError, Result};
use crate::types::MarketRecord;

/// Canonical form of a token address used as the aggregation key.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Pick the authoritative listing per base-token address.
///
/// Records are grouped by lower-cased `baseToken.address`. Within a group the
/// listing with the greatest reported liquidity wins; a listing without
/// liquidity ranks as 0. On equal liquidity the record seen first in `records`
/// is kept, so the result depends on input order but never on map iteration.
pub fn select_best<I>(records: I) -> BTreeMap<String, MarketRecord>
where
    I: IntoIterator<Item = MarketRecord>,
{
    let mut best: BTreeMap<String, MarketRecord> = BTreeMap::new();

    for record in records {
        let key = normalize_address(&record.base_token.address);
        match best.get(&key) {
            Some(current) if !outranks(&record, current) => {}
            _ => {
                best.insert(key, record);
            }
        }
    }

    best
}

/// Same liquidity-max rule as [`select_best`], without grouping. Used when the
/// caller already narrowed the candidates to a single address.
pub fn select_one<I>(address: &str, records: I) -> Result<MarketRecord>
where
    I: IntoIterator<Item = MarketRecord>,
{
    let mut best: Option<MarketRecord> = None;

    for record in records {
        match &best {
            Some(current) if !outranks(&record, current) => {}
            _ => best = Some(record),
        }
    }

    best.ok_or_else(|| AppError::NoListingsFound(normalize_address(address)))
}

/// Strictly greater liquidity replaces the incumbent; ties keep it.
fn outranks(candidate: &MarketRecord, incumbent: &MarketRecord) -> bool {
    candidate.ranking_liquidity() > incumbent.ranking_liquidity()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Liquidity;

    fn record(address: &str, pair: &str, liquidity: Option<f64>) -> MarketRecord {
        let mut r: MarketRecord = serde_json::from_value(serde_json::json!({
            "baseToken": { "address": address, "name": "Test", "symbol": "TST" },
            "pairAddress": pair,
            "priceUsd": "1.0"
        }))
        .unwrap();
        r.liquidity = liquidity.map(|usd| Liquidity { usd: Some(usd) });
        r
    }

    #[test]
    fn groups_case_insensitively_and_keeps_most_liquid() {
        let best = select_best(vec![
            record("0xAA", "p1", Some(5.0)),
            record("0xaa", "p2", Some(50.0)),
        ]);
        assert_eq!(best.len(), 1);
        let winner = best.get("0xaa").expect("group for 0xaa");
        assert_eq!(winner.pair_address, "p2");
    }

    #[test]
    fn winner_is_independent_of_order_when_liquidity_differs() {
        let a = record("0xaa", "a", Some(10.0));
        let b = record("0xaa", "b", Some(20.0));
        let forward = select_best(vec![a.clone(), b.clone()]);
        let backward = select_best(vec![b, a]);
        assert_eq!(forward["0xaa"].pair_address, "b");
        assert_eq!(backward["0xaa"].pair_address, "b");
    }

    #[test]
    fn equal_liquidity_keeps_first_seen() {
        let a = record("0xaa", "a", Some(10.0));
        let b = record("0xaa", "b", Some(10.0));
        assert_eq!(select_best(vec![a.clone(), b.clone()])["0xaa"].pair_address, "a");
        assert_eq!(select_best(vec![b, a])["0xaa"].pair_address, "b");
    }

    #[test]
    fn missing_liquidity_never_beats_reported_liquidity() {
        let none = record("0xaa", "none", None);
        let tiny = record("0xaa", "tiny", Some(0.5));
        assert_eq!(select_best(vec![none.clone(), tiny.clone()])["0xaa"].pair_address, "tiny");
        assert_eq!(select_best(vec![tiny, none])["0xaa"].pair_address, "tiny");
    }

    #[test]
    fn duplicate_records_are_independent_candidates() {
        let a = record("0xaa", "a", Some(10.0));
        let best = select_best(vec![a.clone(), a.clone(), record("0xbb", "b", None)]);
        assert_eq!(best.len(), 2);
        assert_eq!(best["0xaa"], a);
        assert_eq!(best["0xbb"].pair_address, "b");
    }

    #[test]
    fn select_one_ignores_address_grouping() {
        let winner = select_one(
            "0xaa",
            vec![record("0xaa", "a", Some(1.0)), record("0xbb", "b", Some(2.0))],
        )
        .unwrap();
        assert_eq!(winner.pair_address, "b");
    }

    #[test]
    fn select_one_equal_liquidity_keeps_first_seen() {
        let a = record("0xaa", "a", Some(10.0));
        let b = record("0xaa", "b", Some(10.0));
        assert_eq!(select_one("0xaa", vec![a.clone(), b.clone()]).unwrap().pair_address, "a");
        assert_eq!(select_one("0xaa", vec![b, a]).unwrap().pair_address, "b");
    }

    #[test]
    fn select_one_on_empty_input_is_no_listings() {
        let err = select_one("0xAA", Vec::new()).unwrap_err();
        match err {
            AppError::NoListingsFound(addr) => assert_eq!(addr, "0xaa"),
            other => panic!("expected NoListingsFound, got {other:?}"),
        }
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_address("  0xAbC "), "0xabc");
    }
}

use crate::config::stability_thresholds::*;
use crate::error::{AppError, Result};
use crate::types::{
    MarketRecord, PriceVolatility, StabilityAnalysis, StabilityFactors, StabilityStatus, Trend,
    VolumeTrend,
};

/// Raw signals every part of the analysis is derived from.
#[derive(Debug, Clone, Copy)]
struct Signals {
    h1_change: f64,
    /// Absolute % distance from the price implied one hour ago.
    deviation_pct: f64,
    /// Liquidity with the scoring default (absent → 1).
    liquidity: f64,
    turnover_rate: f64,
}

impl Signals {
    fn is_abnormal(&self) -> bool {
        self.deviation_pct > ABNORMAL_DEVIATION || self.turnover_rate > ABNORMAL_TURNOVER
    }
}

/// Parse `priceUsd` into a finite, non-negative price.
pub fn parse_price(price_usd: &str) -> Result<f64> {
    match price_usd.trim().parse::<f64>() {
        Ok(p) if p.is_finite() && p >= 0.0 => Ok(p),
        _ => Err(AppError::InvalidPrice(price_usd.to_string())),
    }
}

/// Score one authoritative record. Fails only when the price is unusable;
/// every absent optional field has a default.
pub fn analyze(record: &MarketRecord) -> Result<StabilityAnalysis> {
    let current_price = parse_price(&record.price_usd)?;
    let signals = signals(record, current_price);

    let score = score(&signals);
    let status = status_for_score(score);
    let factors = factors(&signals);
    let description = describe(factors.abnormal_movement, status).to_string();

    Ok(StabilityAnalysis { score, status, factors, description })
}

fn signals(record: &MarketRecord, current_price: f64) -> Signals {
    let h1_change = record.h1_change();
    let liquidity = record.scoring_liquidity();

    Signals {
        h1_change,
        deviation_pct: deviation_pct(current_price, h1_change),
        liquidity,
        turnover_rate: record.volume_h24() / liquidity,
    }
}

/// Percentage deviation between the current price and the price one hour ago
/// implied by the reported 1h change. A -100% change has no finite basis and
/// counts as unbounded deviation.
pub fn deviation_pct(current_price: f64, h1_change: f64) -> f64 {
    let growth = 1.0 + h1_change / 100.0;
    if growth == 0.0 {
        return f64::INFINITY;
    }
    let basis = current_price / growth;
    let deviation = ((current_price - basis) / basis).abs() * 100.0;
    // 0/0 when the price itself is zero
    if deviation.is_nan() {
        0.0
    } else {
        deviation
    }
}

fn score(s: &Signals) -> u8 {
    let mut raw: i32 = 100;

    if s.liquidity < LIQUIDITY_CRITICAL {
        raw -= 50;
    } else if s.liquidity < LIQUIDITY_LOW {
        raw -= 25;
    } else if s.liquidity < LIQUIDITY_MODEST {
        raw -= 10;
    }

    if s.deviation_pct > DEVIATION_SEVERE {
        raw -= 40;
    } else if s.deviation_pct > DEVIATION_HIGH {
        raw -= 25;
    } else if s.deviation_pct > DEVIATION_MILD {
        raw -= 10;
    }

    // Disjoint ranges: at most one of these fires.
    if s.h1_change < H1_CRASH {
        raw -= 20;
    }
    if s.h1_change > H1_PUMP {
        raw -= 20;
    }

    if s.turnover_rate < TURNOVER_STAGNANT {
        raw -= 20;
    }
    if s.is_abnormal() {
        raw -= 20;
    }

    raw.clamp(0, 100) as u8
}

/// Status band for a score. Lower bounds are inclusive: 40 is VOLATILE,
/// 60 is MODERATE, 80 is STABLE.
pub fn status_for_score(score: u8) -> StabilityStatus {
    if score < STATUS_VOLATILE_MIN {
        StabilityStatus::Extreme
    } else if score < STATUS_MODERATE_MIN {
        StabilityStatus::Volatile
    } else if score < STATUS_STABLE_MIN {
        StabilityStatus::Moderate
    } else {
        StabilityStatus::Stable
    }
}

fn factors(s: &Signals) -> StabilityFactors {
    let price_volatility = if s.deviation_pct > VOLATILITY_HIGH {
        PriceVolatility::High
    } else if s.deviation_pct > VOLATILITY_MEDIUM {
        PriceVolatility::Medium
    } else {
        PriceVolatility::Low
    };

    let volume_trend = if s.turnover_rate > TURNOVER_SPIKE {
        VolumeTrend::Spike
    } else if s.liquidity < LIQUIDITY_THIN {
        VolumeTrend::LowLiq
    } else {
        VolumeTrend::Normal
    };

    let trend = if s.h1_change > TREND_BAND {
        Trend::Up
    } else if s.h1_change < -TREND_BAND {
        Trend::Down
    } else {
        Trend::Sideways
    };

    StabilityFactors {
        price_volatility,
        volume_trend,
        trend,
        abnormal_movement: s.is_abnormal(),
    }
}

fn describe(abnormal: bool, status: StabilityStatus) -> &'static str {
    if abnormal {
        return "Price has deviated severely from its 1h basis; stand aside.";
    }
    match status {
        StabilityStatus::Extreme => "Liquidity too thin or swings too large; stop-loss risk is very high.",
        StabilityStatus::Volatile => "Volatility exceeds strategy thresholds; stops are easily triggered.",
        StabilityStatus::Moderate => "Some volatility present; use slippage protection.",
        StabilityStatus::Stable => "Stable basis, suitable for strategy entry.",
    }
}

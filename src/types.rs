use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MarketRecord: one DexScreener pair listing
// ---------------------------------------------------------------------------

/// One listing of a token pair on one venue, as returned by the price feed.
/// Optional numeric fields default at the point of use, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRecord {
    #[serde(default)]
    pub chain_id: String,
    #[serde(default)]
    pub dex_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pair_address: String,
    pub base_token: BaseToken,
    #[serde(default)]
    pub quote_token: QuoteToken,
    /// Decimal text from the feed; parsed only when scoring.
    #[serde(default)]
    pub price_usd: String,
    #[serde(default)]
    pub price_change: PriceChange,
    #[serde(default)]
    pub volume: Volume,
    #[serde(default)]
    pub liquidity: Option<Liquidity>,
    #[serde(default)]
    pub fdv: Option<f64>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub pair_created_at: Option<i64>,
    #[serde(default)]
    pub info: Option<TokenInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseToken {
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteToken {
    #[serde(default)]
    pub symbol: String,
}

/// Percentage change over trailing windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Liquidity {
    pub usd: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub image_url: Option<String>,
    pub header: Option<String>,
    #[serde(default)]
    pub websites: Vec<Website>,
    #[serde(default)]
    pub socials: Vec<Social>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Website {
    #[serde(default)]
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Social {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub url: String,
}

impl MarketRecord {
    fn liquidity_usd(&self) -> Option<f64> {
        self.liquidity
            .and_then(|l| l.usd)
            .filter(|v| v.is_finite() && *v > 0.0)
    }

    /// Liquidity used to rank competing listings. Absent counts as 0 so a
    /// listing without liquidity never beats one that reports any.
    pub fn ranking_liquidity(&self) -> f64 {
        self.liquidity_usd().unwrap_or(0.0)
    }

    /// Liquidity used as the turnover denominator. Absent or zero counts as 1
    /// so the division is always defined.
    pub fn scoring_liquidity(&self) -> f64 {
        self.liquidity_usd().unwrap_or(1.0)
    }

    pub fn h1_change(&self) -> f64 {
        self.price_change.h1.unwrap_or(0.0)
    }

    pub fn volume_h24(&self) -> f64 {
        self.volume.h24.unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Stability classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StabilityStatus {
    /// score >= 80
    Stable,
    /// score 60–79
    Moderate,
    /// score 40–59
    Volatile,
    /// score < 40
    Extreme,
}

impl std::fmt::Display for StabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StabilityStatus::Stable => "STABLE",
            StabilityStatus::Moderate => "MODERATE",
            StabilityStatus::Volatile => "VOLATILE",
            StabilityStatus::Extreme => "EXTREME",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceVolatility {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for PriceVolatility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PriceVolatility::Low => "LOW",
            PriceVolatility::Medium => "MEDIUM",
            PriceVolatility::High => "HIGH",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeTrend {
    Normal,
    /// Turnover far above pool depth.
    Spike,
    /// Thin pool with ordinary turnover.
    LowLiq,
}

impl std::fmt::Display for VolumeTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VolumeTrend::Normal => "NORMAL",
            VolumeTrend::Spike => "SPIKE",
            VolumeTrend::LowLiq => "LOW_LIQ",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Up,
    Down,
    Sideways,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Up => "UP",
            Trend::Down => "DOWN",
            Trend::Sideways => "SIDEWAYS",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityFactors {
    pub price_volatility: PriceVolatility,
    pub volume_trend: VolumeTrend,
    pub trend: Trend,
    pub abnormal_movement: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityAnalysis {
    pub score: u8,
    pub status: StabilityStatus,
    pub factors: StabilityFactors,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Strategy band and boost window
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedStrategy {
    pub buy_price: f64,
    pub sell_price: f64,
    pub spread: f64,
}

/// Remaining days of the 30-day window after a pair is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostWindow {
    pub remaining_days: u32,
}

// ---------------------------------------------------------------------------
// Snapshot served by the API
// ---------------------------------------------------------------------------

/// Authoritative record for one watched address plus everything derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSnapshot {
    /// Lower-cased base token address.
    pub address: String,
    pub record: MarketRecord,
    pub analysis: StabilityAnalysis,
    pub strategy: CalculatedStrategy,
    pub boost: Option<BoostWindow>,
    pub updated_at_ms: i64,
}

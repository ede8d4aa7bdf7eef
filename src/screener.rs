use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// GICS-style sector used to diversify the optimized subset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Technology,
    Communication,
    ConsumerDiscretionary,
    ConsumerStaples,
    Financials,
    HealthCare,
    Energy,
    Industrials,
    Materials,
    Utilities,
    RealEstate,
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Technology => "Technology",
            Self::Communication => "Communication",
            Self::ConsumerDiscretionary => "Consumer Discretionary",
            Self::ConsumerStaples => "Consumer Staples",
            Self::Financials => "Financials",
            Self::HealthCare => "Health Care",
            Self::Energy => "Energy",
            Self::Industrials => "Industrials",
            Self::Materials => "Materials",
            Self::Utilities => "Utilities",
            Self::RealEstate => "Real Estate",
        };
        f.write_str(name)
    }
}

/// Fundamental ratios as delivered by the data provider; never derived here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub roe: Option<f64>,
    pub roi: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub eps: Option<f64>,
    pub market_cap: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockProfile {
    pub symbol: String,
    pub sector: Sector,
    #[serde(default)]
    pub fundamentals: Fundamentals,
}

/// Threshold filter over [`Fundamentals`]; `None` disables a threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreeningCriteria {
    pub max_pe: Option<f64>,
    pub max_pb: Option<f64>,
    pub min_roe: Option<f64>,
    pub min_roi: Option<f64>,
    pub max_debt_to_equity: Option<f64>,
    /// Strict lower bound: EPS must exceed this value.
    pub min_eps: Option<f64>,
    pub min_market_cap: Option<f64>,
}

impl Default for ScreeningCriteria {
    fn default() -> Self {
        Self {
            max_pe: Some(25.0),
            max_pb: Some(5.0),
            min_roe: Some(0.10),
            min_roi: None,
            max_debt_to_equity: Some(2.0),
            min_eps: Some(0.0),
            min_market_cap: None,
        }
    }
}

impl ScreeningCriteria {
    /// Criteria that accept every profile.
    pub fn permissive() -> Self {
        Self {
            max_pe: None,
            max_pb: None,
            min_roe: None,
            min_roi: None,
            max_debt_to_equity: None,
            min_eps: None,
            min_market_cap: None,
        }
    }

    /// A missing fundamental fails any threshold that is enabled for it.
    pub fn accepts(&self, f: &Fundamentals) -> bool {
        let at_most = |limit: Option<f64>, value: Option<f64>| match limit {
            Some(limit) => value.is_some_and(|v| v <= limit),
            None => true,
        };
        let at_least = |limit: Option<f64>, value: Option<f64>| match limit {
            Some(limit) => value.is_some_and(|v| v >= limit),
            None => true,
        };
        let above = |limit: Option<f64>, value: Option<f64>| match limit {
            Some(limit) => value.is_some_and(|v| v > limit),
            None => true,
        };

        at_most(self.max_pe, f.pe_ratio)
            && at_most(self.max_pb, f.pb_ratio)
            && at_least(self.min_roe, f.roe)
            && at_least(self.min_roi, f.roi)
            && at_most(self.max_debt_to_equity, f.debt_to_equity)
            && above(self.min_eps, f.eps)
            && at_least(self.min_market_cap, f.market_cap)
    }
}

/// Profiles passing every enabled threshold, in input order.
pub fn screen<'a>(criteria: &ScreeningCriteria, profiles: &'a [StockProfile]) -> Vec<&'a StockProfile> {
    profiles
        .iter()
        .filter(|p| criteria.accepts(&p.fundamentals))
        .collect()
}

/// Keeps at most `per_sector` candidates per sector, best ROE first.
///
/// Output is grouped by sector (enum order) and ranked within each sector;
/// equal ROE falls back to symbol order.
pub fn select_diversified<'a>(candidates: &[&'a StockProfile], per_sector: usize) -> Vec<&'a StockProfile> {
    let mut by_sector: BTreeMap<Sector, Vec<&'a StockProfile>> = BTreeMap::new();
    for p in candidates {
        by_sector.entry(p.sector).or_default().push(*p);
    }

    by_sector
        .into_values()
        .flat_map(|mut group| {
            group.sort_by(|a, b| {
                let roe_a = a.fundamentals.roe.unwrap_or(f64::NEG_INFINITY);
                let roe_b = b.fundamentals.roe.unwrap_or(f64::NEG_INFINITY);
                roe_b.total_cmp(&roe_a).then_with(|| a.symbol.cmp(&b.symbol))
            });
            group.truncate(per_sector);
            group
        })
        .collect()
}

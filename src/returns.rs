use crate::error::{AnalyticsError, AnalyticsResult};

/// Daily returns for a fixed set of assets: rows are trading days, columns
/// are assets in caller-defined order.
///
/// All columns share one length; construction fails otherwise, so callers
/// align or truncate upstream (see [`trailing_window`]).
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnMatrix {
    columns: Vec<Vec<f64>>,
    days: usize,
}

impl ReturnMatrix {
    /// Builds the matrix from one return series per asset.
    ///
    /// Every return must be finite.
    pub fn from_columns(columns: Vec<Vec<f64>>) -> AnalyticsResult<Self> {
        let days = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != days) {
            return Err(AnalyticsError::DimensionMismatch {
                expected: days,
                found: bad.len(),
            });
        }
        for (asset, column) in columns.iter().enumerate() {
            if let Some(day) = column.iter().position(|r| !r.is_finite()) {
                return Err(AnalyticsError::degenerate(format!(
                    "non-finite return for asset {} on day {}",
                    asset, day
                )));
            }
        }
        Ok(Self { columns, days })
    }

    pub fn num_assets(&self) -> usize {
        self.columns.len()
    }

    pub fn num_days(&self) -> usize {
        self.days
    }

    /// Return series of asset `j`.
    pub fn column(&self, j: usize) -> &[f64] {
        &self.columns[j]
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Returns of every asset on day `k`, in asset order.
    pub fn day(&self, k: usize) -> impl Iterator<Item = f64> + '_ {
        self.columns.iter().map(move |c| c[k])
    }
}

/// Last `window` elements of `series`, or `InsufficientData` if it is shorter.
pub fn trailing_window(series: &[f64], window: usize) -> AnalyticsResult<&[f64]> {
    if series.len() < window {
        return Err(AnalyticsError::insufficient(window, series.len()));
    }
    Ok(&series[series.len() - window..])
}

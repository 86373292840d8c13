use std::fmt;

/// The provider answered, but has nothing for this ticker (unknown symbol, delisted, or an
/// empty history). Callers recover it with `downcast_ref` to tell "no data" apart from
/// transport failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoDataError {
    pub ticker: String,
    pub reason: String,
}

impl NoDataError {
    pub fn new(ticker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for NoDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no data found for ticker '{}': {}", self.ticker, self.reason)
    }
}

impl std::error::Error for NoDataError {}

/// True when `err` (or anything in its chain) is a [`NoDataError`].
pub fn is_no_data(err: &anyhow::Error) -> bool {
    err.chain().any(|e| e.downcast_ref::<NoDataError>().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn detects_no_data_through_context() {
        let err: anyhow::Result<()> = Err(NoDataError::new("ZZZZ", "empty history").into());
        let err = err.context("market data fetch failed").unwrap_err();
        assert!(is_no_data(&err));
        assert!(!is_no_data(&anyhow::anyhow!("connection reset")));
    }
}

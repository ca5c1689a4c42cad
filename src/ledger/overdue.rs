use chrono::Duration;
use hourglass_rs::{SafeTimeProvider, TimeSource};
use tracing::{info, instrument};

use super::Ledger;
use crate::context::Context;
use crate::errors::{LedgerError, Result};

impl Ledger {
    /// flag missed installments and default lapsed loans
    ///
    /// Pending installments dated before today become Overdue. Active loans
    /// holding an Overdue installment older than `default_after_days` become
    /// Defaulted. The two updates commit separately. Returns the number of
    /// installments newly flagged.
    #[instrument(name = "ledger.scan_overdue", skip(self, ctx, time), err)]
    pub fn scan_overdue(&self, ctx: &Context, time: &SafeTimeProvider) -> Result<usize> {
        let now = time.now();
        let today = now.date_naive();

        let cutoff = Duration::try_days(self.config.default_after_days)
            .and_then(|grace| today.checked_sub_signed(grace))
            .ok_or_else(|| LedgerError::InvalidConfiguration {
                message: format!(
                    "default_after_days {} puts the default cutoff out of range",
                    self.config.default_after_days
                ),
            })?;

        let flagged = self
            .db
            .unit_of_work(ctx, |s| s.mark_overdue_items(today, now))?;

        let defaulted = self
            .db
            .unit_of_work(ctx, |s| s.default_lapsed_loans(cutoff, now))?;

        if flagged > 0 || defaulted > 0 {
            info!(%today, flagged, defaulted, "overdue scan applied");
        }
        Ok(flagged)
    }

    /// scan using system time
    pub fn scan_overdue_now(&self, ctx: &Context) -> Result<usize> {
        let time = SafeTimeProvider::new(TimeSource::System);
        self.scan_overdue(ctx, &time)
    }
}

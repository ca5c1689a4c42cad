use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::Ledger;
use crate::context::Context;
use crate::errors::Result;
use crate::payments::NewLoanPayment;
use crate::records::LoanPayment;
use crate::types::{LoanStatus, ScheduleItemId};

impl Ledger {
    /// settle one schedule item
    ///
    /// Locks the loan and the item, validates the payment, then inserts the
    /// payment record, marks the item paid, lowers the outstanding balance and
    /// completes the loan once nothing is left. A rejected payment changes
    /// nothing.
    #[instrument(
        name = "ledger.record_payment",
        skip(self, ctx, payment),
        fields(loan_id = %payment.loan_id, total = %payment.total_amount),
        err
    )]
    pub fn record_payment(
        &self,
        ctx: &Context,
        payment: NewLoanPayment,
        schedule_item_id: ScheduleItemId,
    ) -> Result<LoanPayment> {
        let (record, outstanding) = self.db.unit_of_work(ctx, |s| {
            let loan = s.load_loan_for_update(payment.loan_id)?;
            let item = s.load_schedule_item_for_update(schedule_item_id)?;

            if let Err(err) = payment.validate_against(&loan, &item) {
                warn!(error = %err, "payment rejected");
                return Err(err);
            }

            let now = Utc::now();
            let record = LoanPayment {
                id: Uuid::new_v4(),
                loan_id: loan.id,
                payment_number: payment.payment_number.clone(),
                payment_date: payment.payment_date,
                principal_amount: payment.principal_amount,
                interest_amount: payment.interest_amount,
                total_amount: payment.total_amount,
                payment_method: payment.payment_method.clone(),
                transaction_reference: payment.transaction_reference.clone(),
                notes: payment.notes.clone(),
                created_at: now,
            };
            s.insert_payment(&record)?;
            s.mark_item_paid(item.id, record.id, now)?;

            let outstanding = loan.outstanding_amount - record.principal_amount;
            s.set_outstanding(loan.id, outstanding, now)?;
            if !outstanding.is_positive() {
                s.set_loan_status(loan.id, LoanStatus::Completed, now)?;
            }

            Ok((record, outstanding))
        })?;

        info!(
            payment_id = %record.id,
            %schedule_item_id,
            %outstanding,
            "payment recorded"
        );
        Ok(record)
    }
}

pub mod calendar;
pub mod config;
pub mod context;
pub mod decimal;
pub mod errors;
pub mod ledger;
pub mod payments;
pub mod records;
pub mod store;
pub mod types;

// re-export key types
pub use config::EngineConfig;
pub use context::{CancelHandle, Context};
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use ledger::Ledger;
pub use payments::{generate_schedule, NewLoanPayment, ScheduledInstallment};
pub use records::{
    Company, Loan, LoanPayment, LoanScheduleItem, LoanTerms, NewCompany, NewLoan, NewLoanBuilder,
};
pub use store::Database;
pub use types::{
    CompanyId, LoanId, LoanStatus, PartyRole, PaymentFrequency, PaymentId, ScheduleItemId,
    ScheduleItemStatus,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;

//! Credit card invoices: billing cycle dates, derived status, settlement and
//! the daily automatic debit sweep.

mod core;
mod daily_guard;
mod list_endpoint;
mod payment;
mod sweep;

pub use core::{
    CreditCardInvoice, InvoiceDates, InvoiceStatus, add_purchase_to_invoice,
    billing_cycle_due_on, billing_cycle_for_purchase, billing_cycle_offset, create_invoice_table,
    get_invoice, get_invoice_for_cycle, get_invoices, invoice_status,
};
pub use daily_guard::{create_daily_debit_checker_table, try_acquire_daily_slot};
pub use list_endpoint::get_invoices_endpoint;
pub use payment::{pay_invoice, pay_invoice_endpoint};
pub use sweep::{SweepOutcome, SweptInvoice, sweep_automatic_debits};

//! Delivery receipts: the dedup and acknowledgement ledger.

mod model;
mod repository;

pub use model::DeliveryReceipt;
pub use repository::ReceiptRepository;

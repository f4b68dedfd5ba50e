mod error;
mod ports;
mod snapshot;
mod table_store;
mod tables;

pub use error::StoreError;
pub use ports::{NarrativeWrite, PaymentUpdate, RecordStore};
pub use table_store::TableStore;

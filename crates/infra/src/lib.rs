//! Infrastructure layer: persistence, configuration, and the workflow engine.

pub mod clock;
pub mod config;
pub mod engine;
pub mod numbering;
pub mod store;
pub mod workflows;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppConfig;
pub use engine::{BusinessPolicy, Engine, WorkflowError, WorkflowResult};
pub use numbering::{DailySequence, DocumentNumbers};
pub use store::{InMemoryStore, PostgresStore, Store, StoreError};
pub use workflows::{PurchaseOrderRequest, SalesOrderRequest};

mod integration_tests;

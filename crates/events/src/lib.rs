pub mod audit;
pub mod event;
pub mod handler;

pub use audit::{AuditEntry, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use event::Event;
pub use handler::execute;

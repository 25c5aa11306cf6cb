pub mod reconciliation_service;

pub use reconciliation_service::{ ReconciliationPipeline, SyncReport };

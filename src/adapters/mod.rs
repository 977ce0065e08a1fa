// Adapters layer: concrete implementations for external systems (http backends, storage).

pub mod http;
pub mod storage;

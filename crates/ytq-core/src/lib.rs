pub mod config;
pub mod logging;

pub mod control;
pub mod coordinator;
pub mod discovery;
pub mod envelope;
pub mod executor;
pub mod model;
pub mod pool;
pub mod quota;
pub mod scheduler;
pub mod store;
pub mod url_model;

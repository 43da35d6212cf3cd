pub mod fsops;
pub mod logging;
pub mod persist;

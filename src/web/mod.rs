pub mod preview;

pub use preview::PreviewServer;

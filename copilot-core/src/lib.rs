pub mod config;
pub mod event;
pub mod payload;
pub mod stage;
pub mod text;
pub mod types;

pub use config::*;
pub use event::*;
pub use payload::*;
pub use stage::*;
pub use text::*;
pub use types::*;

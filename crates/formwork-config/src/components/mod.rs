//! Configuration sections, one per runtime component.

pub mod data_source;
pub mod logging;
pub mod presence;
pub mod render;

pub use data_source::*;
pub use logging::*;
pub use presence::*;
pub use render::*;

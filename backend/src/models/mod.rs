pub mod event;
pub mod geo;
pub mod hotspot;
pub mod macros;
pub mod time;
pub mod view;

pub use event::*;
pub use geo::*;
pub use hotspot::*;
pub use time::*;
pub use view::*;

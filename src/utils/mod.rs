#[macro_use]
pub mod logging;
pub mod filters;
pub mod math;

pub mod api;
pub mod random;
pub mod spawn;
pub mod timer;

pub mod accounts;
pub mod cover;
pub mod memory;
pub mod roll;
pub mod suggest;
pub mod utils;

pub use utils::*;

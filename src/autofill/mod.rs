pub mod catalog;
pub mod form;
pub mod memory;
pub mod providers;
pub mod reconcile;
pub mod roll;
pub mod suggest;

pub use memory::{DeviceStore, KeyValueStore, LocalMemory};
pub use reconcile::{PersistAction, Reconciler};

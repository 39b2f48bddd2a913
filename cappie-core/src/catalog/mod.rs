pub mod device_catalog;

pub use device_catalog::DeviceCatalog;

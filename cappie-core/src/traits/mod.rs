pub mod authorization_provider;
pub mod capture_backend;
pub mod capture_delegate;
pub mod capture_device;
pub mod destination_chooser;
pub mod device_provider;
pub mod movie_muxer;

pub mod controller;
pub mod file_name;

pub use controller::RecordingController;
pub use file_name::generate_file_name;

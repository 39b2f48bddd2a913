pub mod capture_session;
pub mod frame_rate;
pub mod manager;
pub mod outputs;
pub mod queue;

pub use capture_session::CaptureSession;
pub use manager::SessionManager;

pub mod level_controller;

pub use level_controller::AudioLevelController;

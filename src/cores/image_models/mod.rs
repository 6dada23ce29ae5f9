pub mod bfl;
pub mod image_controller;
pub mod openai;
pub mod runware;

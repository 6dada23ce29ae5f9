pub mod image_models;
pub mod jobs;
pub mod state;
pub mod text_models;

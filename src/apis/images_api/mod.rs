pub mod bfl;
pub mod gemini;
pub mod image;
pub mod runware;
pub mod schemas;

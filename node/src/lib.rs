pub mod board;
pub mod photo;

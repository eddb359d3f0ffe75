pub mod clut;
pub mod color;
pub mod common;
pub mod editor;
pub mod error;
pub mod palette;
pub mod persist;
pub mod section;
pub mod shade;
pub mod sprite;
pub mod state;

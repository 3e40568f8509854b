//! Rendering contracts
//!
//! Drawing itself is delegated to [`Camera`] implementations supplied by the
//! host application.

pub mod camera;

pub use camera::{AsDynCamera, Camera, CAMERA_TAG};
pub use crate::scene::NodeView;

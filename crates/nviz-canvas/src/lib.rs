//! Scene bookkeeping for an interactive 3D map canvas.
//!
//! The native display engine owns every rendered object. This library keeps the
//! mirror of that state needed to drive the engine idempotently:
//!
//! - [`registry`] loads and unloads tree layers and constant surfaces.
//! - [`store`] pushes only the dirty attributes of each object.
//! - [`view`] and [`cplane`] hold camera, light and cutting-plane state.
//! - [`command`] exports the whole scene as an `nviz_cmd` invocation.
//! - [`scene`] ties them together behind a single command dispatcher.

pub mod color;
pub mod command;
pub mod cplane;
pub mod engine;
pub mod error;
pub mod properties;
pub mod query;
pub mod registry;
pub mod scene;
pub mod settings;
pub mod startup;
pub mod store;
pub mod tree;
pub mod view;

pub use error::{Result, SceneError};
pub use scene::{Scene, SceneCommand, SharedScene};

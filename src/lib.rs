//! Real-time spotlight shadow mapping around a small animated scene.
//!
//! The crate owns the scene model (entities, lights, camera), the per-frame
//! update state machine, the constant-data composer and the pass drivers that
//! record shadow and main passes. The recorded frames are executed by the
//! wgpu [`Renderer`] or, without a GPU, replayed through a [`BindingAudit`].

pub mod app;
pub mod assets;
pub mod camera;
pub mod config;
pub mod constants;
pub mod error;
pub mod input;
pub mod light;
pub mod material;
pub mod mesh;
pub mod render;
pub mod scene;
pub mod texture;
pub mod timing;
pub mod transform;
pub mod update;

pub use app::{run_headless, run_windowed, HeadlessReport, ScriptedPress, Simulation, WindowInitError};
pub use assets::{AssetCatalog, MeshId, TextureId};
pub use camera::Camera;
pub use config::Settings;
pub use error::{ConfigError, InitError};
pub use input::{InputProvider, InputState, KeyCode, NamedKey};
pub use light::{ConeAngle, Light, LightBehavior};
pub use material::{Material, Technique, TextureSet};
pub use render::{record_frame, BindingAudit, BindingHazard, FrameCommands, Renderer, Viewport};
pub use scene::{Model, Scene};
pub use transform::Entity;
pub use update::{SceneUpdate, ToggleEvents};

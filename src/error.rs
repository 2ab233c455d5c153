use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while building the scene and its GPU resources.
///
/// Every variant is fatal to start-up: the application reports the message
/// and never enters the frame loop.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to load mesh {name}: {reason}")]
    Mesh { name: String, reason: String },

    #[error("failed to load texture {name}: {reason}")]
    Texture { name: String, reason: String },

    #[error("failed to decode texture {}", path.display())]
    TextureDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("error creating shadow map: {0}")]
    ShadowMap(String),

    #[error("error loading shaders: {0}")]
    Shader(String),

    #[error("error creating GPU device: {0}")]
    Device(String),
}

impl InitError {
    pub fn mesh(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Mesh {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn texture(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Texture {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Problems with user supplied settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("spotlight cone angle must lie strictly between 0 and 180 degrees, got {0}")]
    ConeAngle(f32),

    #[error("shadow map size must lie within [{min}, {max}], got {value}")]
    ShadowMapSize { value: u32, min: u32, max: u32 },

    #[error("unknown key name {name:?} bound to {action}")]
    UnknownKey { action: &'static str, name: String },

    #[error("invalid scripted key press {0:?}; expected FRAME:KEY")]
    ScriptedPress(String),

    #[error("time step must be a finite, non-negative number of seconds, got {0}")]
    TimeStep(f32),
}

//! Decoded RGBA8 images and the providers that produce them.

use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3, Vec4};

use crate::error::InitError;

/// How the texel values are interpreted when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// sRGB-encoded colour in rgb, linear data (specular strength) in alpha.
    Color,
    /// Linear data such as normal/height maps.
    Linear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows.
    pub pixels: Vec<u8>,
    pub kind: TextureKind,
}

impl TextureData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>, kind: TextureKind) -> Result<Self, String> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 {
            return Err("texture has zero area".to_string());
        }
        if pixels.len() != expected {
            return Err(format!(
                "expected {expected} bytes for {width}x{height} RGBA8, got {}",
                pixels.len()
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
            kind,
        })
    }

    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut texel = [0; 4];
        texel.copy_from_slice(&self.pixels[offset..offset + 4]);
        texel
    }
}

/// Supplies textures by file name. Failures abort scene initialisation.
pub trait TextureProvider {
    fn load(&self, name: &str, kind: TextureKind) -> Result<TextureData, InitError>;
}

/// Loads image files (PNG or JPEG) from a directory.
#[derive(Debug, Clone)]
pub struct DirectoryTextures {
    root: PathBuf,
}

impl DirectoryTextures {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TextureProvider for DirectoryTextures {
    fn load(&self, name: &str, kind: TextureKind) -> Result<TextureData, InitError> {
        let path = self.root.join(name);
        let image = image::open(&path)
            .map_err(|source| InitError::TextureDecode { path, source })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        TextureData::new(width, height, image.into_raw(), kind)
            .map_err(|reason| InitError::texture(name, reason))
    }
}

/// Synthesises the demo scene's textures so the program runs without an
/// asset pack. Names are matched on their file stem.
#[derive(Debug, Clone, Copy)]
pub struct ProceduralTextures {
    pub size: u32,
}

impl Default for ProceduralTextures {
    fn default() -> Self {
        Self { size: 256 }
    }
}

impl TextureProvider for ProceduralTextures {
    fn load(&self, name: &str, kind: TextureKind) -> Result<TextureData, InitError> {
        let stem = Path::new(name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(name);
        let size = self.size.max(2);
        let pixels = match stem {
            "GrassDiffuseSpecular" => paint(size, |uv| {
                let grain = hash_noise(uv * 64.0);
                let green = Vec3::new(0.16, 0.38, 0.09).lerp(Vec3::new(0.28, 0.5, 0.14), grain);
                green.extend(0.1)
            }),
            "CargoA" => paint(size, |uv| {
                let rib = ((uv.x * 40.0).fract() - 0.5).abs() * 2.0;
                let paint = Vec3::new(0.72, 0.3, 0.08) * (0.75 + 0.25 * rib);
                let edge = uv.y < 0.04 || uv.y > 0.96;
                if edge {
                    Vec3::splat(0.25).extend(0.6)
                } else {
                    paint.extend(0.35)
                }
            }),
            "StoneDiffuseSpecular" => paint(size, |uv| {
                let (block, mortar) = bricks(uv, 6.0, 4.0);
                let tone = 0.42 + 0.18 * hash_noise(block);
                if mortar {
                    Vec3::splat(0.2).extend(0.05)
                } else {
                    Vec3::new(tone, tone * 0.97, tone * 0.92).extend(0.25)
                }
            }),
            "PatternDiffuseSpecular" => paint(size, |uv| {
                let cell = (uv * 8.0).floor();
                if (cell.x + cell.y) as i32 % 2 == 0 {
                    Vec3::new(0.8, 0.75, 0.6).extend(1.0)
                } else {
                    Vec3::new(0.35, 0.15, 0.45).extend(0.6)
                }
            }),
            "PatternNormal" => height_map(size, 4.0, |uv| {
                let wave = (uv * std::f32::consts::TAU * 8.0).to_array();
                0.5 + 0.25 * (wave[0].sin() + wave[1].sin())
            }),
            "TechDiffuseSpecular" => paint(size, |uv| {
                let grid = (uv * 4.0).fract();
                let line = grid.x < 0.06 || grid.y < 0.06;
                if line {
                    Vec3::new(0.1, 0.6, 0.9).extend(1.0)
                } else {
                    Vec3::splat(0.55).extend(0.7)
                }
            }),
            "TechNormalHeight" => height_map(size, 2.0, |uv| {
                let grid = (uv * 4.0).fract();
                let inset = grid.x.min(grid.y).min(1.0 - grid.x).min(1.0 - grid.y);
                (inset * 8.0).clamp(0.0, 1.0)
            }),
            "Lines" => paint(size, |uv| {
                if (uv.y * 16.0).fract() < 0.5 {
                    Vec3::new(0.95, 0.95, 0.95).extend(0.8)
                } else {
                    Vec3::new(0.1, 0.1, 0.1).extend(0.2)
                }
            }),
            "Flare" => paint(size, |uv| {
                let distance = (uv - Vec2::splat(0.5)).length() * 2.0;
                let glow = (1.0 - distance).max(0.0).powf(2.0);
                Vec3::splat(glow).extend(1.0)
            }),
            "wood2" => paint(size, |uv| {
                let rings = ((uv - Vec2::new(0.3, -0.4)).length() * 40.0 + hash_noise(uv * 16.0)).fract();
                Vec3::new(0.55, 0.35, 0.18)
                    .lerp(Vec3::new(0.4, 0.24, 0.11), rings)
                    .extend(0.15)
            }),
            _ => return Err(InitError::texture(name, "no procedural pattern with that name")),
        };
        TextureData::new(size, size, pixels, kind).map_err(|reason| InitError::texture(name, reason))
    }
}

/// Samples `shade` at texel centres. Channels are clamped to [0, 1].
fn paint(size: u32, shade: impl Fn(Vec2) -> Vec4) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(size as usize * size as usize * 4);
    for y in 0..size {
        for x in 0..size {
            let uv = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) / size as f32;
            let color = shade(uv).clamp(Vec4::ZERO, Vec4::ONE);
            pixels.extend(color.to_array().map(|channel| (channel * 255.0).round() as u8));
        }
    }
    pixels
}

/// Tangent-space normals derived from a height field, with the height
/// itself kept in alpha.
fn height_map(size: u32, bumpiness: f32, height: impl Fn(Vec2) -> f32) -> Vec<u8> {
    let step = 1.0 / size as f32;
    paint(size, |uv| {
        let h = height(uv);
        let dx = (height(uv + Vec2::new(step, 0.0)) - height(uv - Vec2::new(step, 0.0))) * bumpiness;
        let dy = (height(uv + Vec2::new(0.0, step)) - height(uv - Vec2::new(0.0, step))) * bumpiness;
        let normal = Vec3::new(-dx, -dy, 1.0).normalize();
        (normal * 0.5 + Vec3::splat(0.5)).extend(h)
    })
}

fn bricks(uv: Vec2, columns: f32, rows: f32) -> (Vec2, bool) {
    let row = (uv.y * rows).floor();
    let shift = if row as i32 % 2 == 0 { 0.0 } else { 0.5 };
    let column = (uv.x * columns + shift).floor();
    let local = Vec2::new((uv.x * columns + shift).fract(), (uv.y * rows).fract());
    let mortar = local.x < 0.05 || local.y < 0.07;
    (Vec2::new(column, row), mortar)
}

/// Cheap deterministic value in [0, 1) for a lattice point.
fn hash_noise(point: Vec2) -> f32 {
    let p = point.floor();
    let dot = p.x * 12.9898 + p.y * 78.233;
    (dot.sin() * 43_758.547).fract().abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO_TEXTURES: [&str; 10] = [
        "GrassDiffuseSpecular.png",
        "CargoA.png",
        "StoneDiffuseSpecular.png",
        "PatternDiffuseSpecular.png",
        "PatternNormal.png",
        "TechDiffuseSpecular.png",
        "TechNormalHeight.png",
        "Lines.png",
        "Flare.jpg",
        "wood2.jpg",
    ];

    #[test]
    fn procedural_provider_covers_demo_textures() {
        let provider = ProceduralTextures { size: 16 };
        for name in DEMO_TEXTURES {
            let texture = provider.load(name, TextureKind::Color).unwrap();
            assert_eq!(texture.pixels.len(), 16 * 16 * 4, "{name}");
        }
    }

    #[test]
    fn flat_height_encodes_up_normal() {
        let pixels = height_map(4, 1.0, |_| 0.25);
        assert_eq!(&pixels[..4], &[128, 128, 255, 64]);
    }

    #[test]
    fn directory_provider_decodes_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut image = image::RgbaImage::new(2, 3);
        image.put_pixel(1, 2, image::Rgba([10, 20, 30, 40]));
        image.save(dir.path().join("Lines.png")).unwrap();

        let texture = DirectoryTextures::new(dir.path())
            .load("Lines.png", TextureKind::Color)
            .unwrap();
        assert_eq!((texture.width, texture.height), (2, 3));
        assert_eq!(texture.texel(1, 2), [10, 20, 30, 40]);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectoryTextures::new(dir.path())
            .load("Flare.jpg", TextureKind::Color)
            .unwrap_err();
        assert!(err.to_string().contains("Flare.jpg"));
    }

    #[test]
    fn pixel_buffer_size_is_checked() {
        assert!(TextureData::new(2, 2, vec![0; 15], TextureKind::Linear).is_err());
        assert!(TextureData::new(0, 2, vec![], TextureKind::Linear).is_err());
    }
}

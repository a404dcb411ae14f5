use formats::{RasterError, RasterImage};

/// Diffuse grey used for untextured terrain.
pub const TERRAIN_GREY: f32 = 0.85;

/// PNG-encoded texture as handed to a renderer.
#[derive(Clone, PartialEq, Eq)]
pub struct Texture {
    width: u32,
    height: u32,
    png: Vec<u8>,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

impl Texture {
    pub fn from_raster(raster: &RasterImage) -> Result<Self, RasterError> {
        Ok(Self {
            width: raster.width(),
            height: raster.height(),
            png: raster.encode_png()?,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Flat { diffuse: [f32; 3], specular: [f32; 3] },
    Textured { texture: Texture },
}

impl Material {
    /// Matte grey, no highlights.
    pub fn terrain_grey() -> Self {
        Material::Flat {
            diffuse: [TERRAIN_GREY; 3],
            specular: [0.0; 3],
        }
    }

    pub fn textured(texture: Texture) -> Self {
        Material::Textured { texture }
    }

    pub fn texture(&self) -> Option<&Texture> {
        match self {
            Material::Textured { texture } => Some(texture),
            Material::Flat { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use formats::RasterImage;

    use super::{Material, Texture};

    #[test]
    fn texture_keeps_raster_size_and_decodes_back() {
        let raster = RasterImage::filled(512, 256, [10, 20, 30, 255]);
        let texture = Texture::from_raster(&raster).unwrap();
        assert_eq!((texture.width(), texture.height()), (512, 256));
        assert_eq!(RasterImage::decode(texture.png()).unwrap(), raster);

        let material = Material::textured(texture);
        assert!(material.texture().is_some());
        assert!(Material::terrain_grey().texture().is_none());
    }
}

use crate::AssetError;
use std::fmt;
use std::path::Path;

/// One face of a cubemap, in GPU layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CubeFace {
    /// +X
    Right,
    /// -X
    Left,
    /// +Y
    Top,
    /// -Y
    Bottom,
    /// +Z
    Front,
    /// -Z
    Back,
}

impl CubeFace {
    pub const ALL: [Self; 6] = [
        Self::Right,
        Self::Left,
        Self::Top,
        Self::Bottom,
        Self::Front,
        Self::Back,
    ];

    /// Layer offset from the +X face target.
    pub fn layer(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Right => "right",
            Self::Left => "left",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Front => "front",
            Self::Back => "back",
        }
    }
}

impl fmt::Display for CubeFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded RGBA8 face image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl FaceImage {
    /// Decode an image file into RGBA8. Rows are kept top-to-bottom, which is
    /// what cubemap sampling expects.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let rgba = image::open(path)
            .map_err(|source| AssetError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        tracing::debug!(path = %path.display(), width, height, "decoded face image");
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// Wrap raw RGBA8 pixels, checking the buffer length.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, AssetError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(AssetError::PixelCount {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Single-color image, handy for placeholder faces.
    pub fn solid(size: u32, color: [u8; 4]) -> Self {
        let pixels = color.repeat(size as usize * size as usize);
        Self {
            width: size,
            height: size,
            pixels,
        }
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faces_are_in_layer_order() {
        let layers: Vec<u32> = CubeFace::ALL.iter().map(|f| f.layer()).collect();
        assert_eq!(layers, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(CubeFace::Bottom.to_string(), "bottom");
    }

    #[test]
    fn loads_png_as_rgba() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        img.save(file.path()).unwrap();

        let face = FaceImage::load(file.path()).unwrap();
        assert_eq!((face.width, face.height), (4, 4));
        assert_eq!(&face.pixels[..4], &[10, 20, 30, 255]);
        assert!(face.is_square());
    }

    #[test]
    fn undecodable_file_is_an_image_error() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        std::fs::write(file.path(), b"not a png").unwrap();
        let err = FaceImage::load(file.path()).unwrap_err();
        assert!(matches!(err, AssetError::Image { .. }));
    }

    #[test]
    fn from_rgba_checks_length() {
        assert!(FaceImage::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            FaceImage::from_rgba(2, 2, vec![0; 15]),
            Err(AssetError::PixelCount { expected: 16, actual: 15 })
        ));
    }

    #[test]
    fn solid_fills_every_pixel() {
        let face = FaceImage::solid(3, [1, 2, 3, 4]);
        assert_eq!(face.pixels.len(), 36);
        assert!(face.pixels.chunks_exact(4).all(|p| p == [1, 2, 3, 4]));
    }
}

use image::{GrayImage, RgbImage};
use kornia::{
    image::{Image, ImageError, ImageSize, allocator::CpuAllocator},
    imgproc,
};
use std::path::{Path, PathBuf};

type CpuImage<T, const C: usize> = Image<T, C, CpuAllocator>;

/// Single-channel working copy derived from a [`Raster`].
pub type GrayRaster = GrayImage;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("image not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Owned RGB plate photograph. Loaded once, never modified by the pipeline.
#[derive(Debug, Clone)]
pub struct Raster {
    pixels: RgbImage,
}

impl Raster {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let dynamic = image::open(path).map_err(|source| LoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            pixels: dynamic.to_rgb8(),
        })
    }

    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn channels(&self) -> u8 {
        3
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }

    /// Luma conversion through kornia.
    pub fn to_gray(&self) -> Result<GrayRaster, ImageError> {
        let (width, height) = self.pixels.dimensions();
        if self.is_empty() {
            return Ok(GrayImage::new(width, height));
        }
        let size = ImageSize {
            width: width as usize,
            height: height as usize,
        };
        let image = CpuImage::<u8, 3>::new(size, self.pixels.as_raw().clone(), CpuAllocator)?;
        let mut gray = CpuImage::<u8, 1>::from_size_val(image.size(), 0u8, CpuAllocator)?;
        imgproc::color::gray_from_rgb_u8(&image, &mut gray)?;
        Ok(GrayImage::from_raw(width, height, gray.as_slice().to_vec())
            .unwrap_or_else(|| GrayImage::new(width, height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn missing_file_is_not_found() {
        let err = Raster::load(Path::new("does/not/exist.png")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn gray_keeps_dimensions_and_orders_brightness() {
        let mut rgb = RgbImage::from_pixel(4, 3, Rgb([250, 250, 250]));
        rgb.put_pixel(1, 1, Rgb([10, 10, 10]));
        let gray = Raster::from_rgb(rgb).to_gray().unwrap();
        assert_eq!(gray.dimensions(), (4, 3));
        assert!(gray.get_pixel(1, 1)[0] < gray.get_pixel(0, 0)[0]);
    }
}

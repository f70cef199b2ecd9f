use image::{DynamicImage, Rgb, RgbImage};
use tojpeg_common::Background;

/// Reduce any decoded image to 8-bit RGB suitable for JPEG.
///
/// Pixels with alpha are blended over `background`; opaque images are
/// converted directly.
pub fn flatten(img: &DynamicImage, background: Background) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let [br, bg, bb] = background.rgb();
    let mut out = RgbImage::new(rgba.width(), rgba.height());

    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let alpha = src[3] as u32;
        let blend = |fg: u8, back: u8| -> u8 {
            ((fg as u32 * alpha + back as u32 * (255 - alpha) + 127) / 255) as u8
        };
        *dst = Rgb([blend(src[0], br), blend(src[1], bg), blend(src[2], bb)]);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_transparent_takes_background() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([10, 20, 30, 0]));
        img.put_pixel(1, 0, Rgba([10, 20, 30, 255]));

        let flat = flatten(&DynamicImage::ImageRgba8(img), Background([200, 100, 50]));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([200, 100, 50]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_half_alpha_blends() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 128]));

        let flat = flatten(&DynamicImage::ImageRgba8(img), Background::WHITE);
        let value = flat.get_pixel(0, 0)[0];
        assert!((126..=128).contains(&value), "got {value}");
    }

    #[test]
    fn test_grayscale_alpha() {
        let img = DynamicImage::new_luma_a8(3, 3);
        let flat = flatten(&img, Background::WHITE);
        assert_eq!(flat.dimensions(), (3, 3));
        assert_eq!(flat.get_pixel(1, 1), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_opaque_passthrough() {
        let mut img = RgbImage::new(1, 1);
        img.put_pixel(0, 0, Rgb([1, 2, 3]));
        let flat = flatten(&DynamicImage::ImageRgb8(img), Background::BLACK);
        assert_eq!(flat.get_pixel(0, 0), &Rgb([1, 2, 3]));
    }
}

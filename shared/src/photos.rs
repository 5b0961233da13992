use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{imageops::FilterType, ImageFormat};
use std::io::Cursor;

/// Photos wider or taller than this are downscaled before storage.
const MAX_DIMENSION_PX: u32 = 2048;

pub fn bucket_name() -> String {
    std::env::var("PHOTO_BUCKET").unwrap_or_else(|_| "binwise-bin-photos".to_string())
}

/// S3 key for a complaint's bin photo.
pub fn photo_key(complaint_id: u64) -> String {
    format!("complaints/{}.jpg", complaint_id)
}

/// Determine if a photo needs downscaling before storage
pub fn needs_downscale(width: u32, height: u32) -> bool {
    width > MAX_DIMENSION_PX || height > MAX_DIMENSION_PX
}

/// Decode a base64 photo payload (raw base64 or a data: URL), check it is a
/// real image, downscale oversized shots, and normalize to JPEG bytes.
pub fn prepare_bin_photo(payload: &str) -> Result<Vec<u8>, String> {
    // data:image/...;base64,<data> — keep only the data segment
    let encoded = payload.rsplit(',').next().unwrap_or(payload).trim();

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| format!("Failed to decode base64 photo: {}", e))?;

    let img = image::load_from_memory(&bytes)
        .map_err(|e| format!("Failed to load photo: {}", e))?;

    let img = if needs_downscale(img.width(), img.height()) {
        img.resize(MAX_DIMENSION_PX, MAX_DIMENSION_PX, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Cursor::new(Vec::new());
    rgb.write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| format!("Failed to encode JPEG: {}", e))?;

    Ok(buf.into_inner())
}

/// Upload a prepared bin photo to S3
pub async fn store_bin_photo(
    s3_client: &S3Client,
    key: &str,
    jpeg_bytes: Vec<u8>,
) -> Result<(), String> {
    s3_client
        .put_object()
        .bucket(bucket_name())
        .key(key)
        .body(ByteStream::from(jpeg_bytes))
        .content_type("image/jpeg")
        .send()
        .await
        .map_err(|e| format!("Failed to upload photo to S3: {}", e))?;

    Ok(())
}

/// Fetch a stored bin photo's bytes from S3
pub async fn fetch_bin_photo(s3_client: &S3Client, key: &str) -> Result<Vec<u8>, String> {
    let result = s3_client
        .get_object()
        .bucket(bucket_name())
        .key(key)
        .send()
        .await
        .map_err(|e| format!("Failed to get photo from S3: {}", e))?;

    let body_bytes = result
        .body
        .collect()
        .await
        .map_err(|e| format!("Failed to read S3 body: {}", e))?
        .into_bytes();

    Ok(body_bytes.to_vec())
}

/// Render photo bytes the way the dashboard consumes them.
pub fn data_url(jpeg_bytes: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_png(width: u32, height: u32) -> String {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 120, 40, 255]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        STANDARD.encode(buf.into_inner())
    }

    #[test]
    fn test_needs_downscale() {
        // Within bounds → No
        assert_eq!(needs_downscale(1024, 768), false);

        // Oversized width → Yes
        assert_eq!(needs_downscale(4000, 768), true);

        // Oversized height → Yes
        assert_eq!(needs_downscale(1024, 3000), true);
    }

    #[test]
    fn test_prepare_normalizes_to_jpeg() {
        let jpeg = prepare_bin_photo(&sample_png(32, 32)).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 32);
        // JPEG magic bytes
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_prepare_accepts_data_url() {
        let payload = format!("data:image/png;base64,{}", sample_png(16, 16));
        assert!(prepare_bin_photo(&payload).is_ok());
    }

    #[test]
    fn test_prepare_rejects_non_image() {
        let payload = STANDARD.encode(b"definitely not an image");
        assert!(prepare_bin_photo(&payload).is_err());
    }

    #[test]
    fn test_prepare_rejects_bad_base64() {
        assert!(prepare_bin_photo("%%%not-base64%%%").is_err());
    }

    #[test]
    fn test_data_url_prefix() {
        let url = data_url(&[0xFF, 0xD8, 0xFF]);
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }
}

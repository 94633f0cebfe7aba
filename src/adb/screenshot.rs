//! Screenshot decoding for `adb exec-out screencap -p`.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat, RgbImage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;
use std::process::Output;

use crate::device::{DeviceError, ScreenBounds, Screenshot};

const PNG_MAGIC: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// Used for a placeholder only when `wm size` cannot be read either.
pub const FALLBACK_BOUNDS: ScreenBounds = ScreenBounds {
    width: 1080,
    height: 2400,
};

static WM_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(Physical|Override) size:\s*(\d+)x(\d+)").expect("wm size regex is valid")
});

/// Turn raw screencap output into a screenshot.
///
/// Screens that refuse capture (payment pages, secure keyboards) report
/// `Status: -1` and yield `Ok(None)`.
pub(crate) fn decode_screencap(output: &Output) -> Result<Option<Screenshot>, DeviceError> {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("Status: -1") {
        return Ok(None);
    }

    let png = &output.stdout;
    if png.len() < PNG_MAGIC.len() || &png[..PNG_MAGIC.len()] != PNG_MAGIC {
        return Err(DeviceError::Transient(format!(
            "screencap returned {} bytes without a PNG header: {}",
            png.len(),
            stderr.trim()
        )));
    }

    let img = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(|e| DeviceError::Transient(format!("undecodable screenshot: {}", e)))?;

    Ok(Some(Screenshot::new(
        STANDARD.encode(png),
        img.width(),
        img.height(),
        false,
    )))
}

/// Display size from `wm size` output. An override size wins over the
/// physical one.
pub(crate) fn parse_wm_size(stdout: &str) -> Option<ScreenBounds> {
    let mut physical = None;
    for caps in WM_SIZE.captures_iter(stdout) {
        let bounds = ScreenBounds {
            width: caps[2].parse().ok()?,
            height: caps[3].parse().ok()?,
        };
        if &caps[1] == "Override" {
            return Some(bounds);
        }
        physical = Some(bounds);
    }
    physical
}

/// A black PNG of the given size, flagged sensitive, standing in for a
/// screen that refused capture.
pub fn sensitive_placeholder(bounds: ScreenBounds) -> Result<Screenshot, DeviceError> {
    let black = DynamicImage::ImageRgb8(RgbImage::new(bounds.width, bounds.height));

    let mut buffer = Cursor::new(Vec::new());
    black
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| DeviceError::Transient(format!("cannot encode placeholder: {}", e)))?;

    Ok(Screenshot::new(
        STANDARD.encode(buffer.into_inner()),
        bounds.width,
        bounds.height,
        true,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    fn output(stdout: Vec<u8>, stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(0),
            stdout,
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_decode_reads_dimensions() {
        let data = png(40, 80);
        let screenshot = decode_screencap(&output(data.clone(), "")).unwrap().unwrap();
        assert_eq!((screenshot.width, screenshot.height), (40, 80));
        assert!(!screenshot.is_sensitive);
        assert_eq!(STANDARD.decode(&screenshot.base64_data).unwrap(), data);
    }

    #[test]
    fn test_refused_capture_is_reported() {
        assert!(decode_screencap(&output(Vec::new(), "Status: -1")).unwrap().is_none());
    }

    #[test]
    fn test_garbage_is_transient() {
        let err = decode_screencap(&output(b"not a png".to_vec(), "")).unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_parse_wm_size() {
        let physical = ScreenBounds {
            width: 1080,
            height: 1920,
        };
        assert_eq!(parse_wm_size("Physical size: 1080x1920\n"), Some(physical));
        assert_eq!(
            parse_wm_size("Physical size: 1440x3120\nOverride size: 1080x2340\n"),
            Some(ScreenBounds {
                width: 1080,
                height: 2340
            })
        );
        assert_eq!(parse_wm_size("error: closed"), None);
    }

    #[test]
    fn test_placeholder_uses_real_size() {
        let bounds = ScreenBounds {
            width: 108,
            height: 192,
        };
        let screenshot = sensitive_placeholder(bounds).unwrap();
        assert!(screenshot.is_sensitive);
        assert_eq!(screenshot.bounds(), bounds);

        let decoded = image::load_from_memory(&STANDARD.decode(&screenshot.base64_data).unwrap())
            .unwrap();
        assert_eq!((decoded.width(), decoded.height()), (108, 192));
    }
}

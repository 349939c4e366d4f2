//! QR ticket images.
//!
//! A ticket is the redemption token rendered as a QR code PNG. Orders keep
//! it as a base64 string so it can be embedded directly in an `<img>` data
//! URL or a JSON response.
//!
//! Rendering is deterministic: the same token and [`TicketConfig`] always
//! produce the same bytes, which is what makes regeneration from the order
//! row safe.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};
use thiserror::Error;

use quickbites_core::RedemptionToken;

const LIGHT: Luma<u8> = Luma([255]);
const DARK: Luma<u8> = Luma([0]);

/// Errors from rendering or reading tickets.
#[derive(Debug, Error)]
pub enum TicketError {
    /// The payload does not fit in a QR code.
    #[error("qr encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    /// PNG encoding or decoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The portable string is not base64.
    #[error("ticket is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The rendered image would exceed the supported dimensions.
    #[error("ticket image too large")]
    TooLarge,

    /// No QR code was found in the image.
    #[error("no qr code found in image")]
    NoCode,

    /// A QR code was found but could not be read.
    #[error("qr decoding failed: {0}")]
    Decode(String),
}

/// Rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketConfig {
    /// Error-correction level.
    pub ec_level: EcLevel,
    /// Pixels per module (must be at least 1).
    pub module_size: u32,
    /// Quiet-zone width in modules.
    pub border: u32,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            ec_level: EcLevel::M,
            module_size: 10,
            border: 5,
        }
    }
}

/// Parse an error-correction level name (`L`, `M`, `Q`, `H`).
#[must_use]
pub fn parse_ec_level(value: &str) -> Option<EcLevel> {
    match value.trim().to_ascii_uppercase().as_str() {
        "L" => Some(EcLevel::L),
        "M" => Some(EcLevel::M),
        "Q" => Some(EcLevel::Q),
        "H" => Some(EcLevel::H),
        _ => None,
    }
}

/// Renders tokens into ticket images.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketRenderer {
    config: TicketConfig,
}

impl TicketRenderer {
    /// Create a renderer.
    #[must_use]
    pub const fn new(config: TicketConfig) -> Self {
        Self { config }
    }

    /// Render arbitrary text as a QR code PNG.
    ///
    /// The smallest QR version that fits the payload is chosen automatically.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::Encode` if the payload is too long, or
    /// `TicketError::Image` if PNG encoding fails.
    pub fn render_png(&self, payload: &str) -> Result<Vec<u8>, TicketError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), self.config.ec_level)?;
        let image = self.rasterize(&code)?;

        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::L8,
        )?;
        Ok(png)
    }

    /// Render a redemption token as a base64 PNG, ready to store on an order.
    ///
    /// # Errors
    ///
    /// Same as [`TicketRenderer::render_png`].
    pub fn render_token(&self, token: &RedemptionToken) -> Result<String, TicketError> {
        self.render_png(&token.to_string())
            .map(|png| to_portable_string(&png))
    }

    fn rasterize(&self, code: &QrCode) -> Result<GrayImage, TicketError> {
        let modules = code.width();
        let module_size = self.config.module_size.max(1);
        let border = self.config.border;

        let side = u32::try_from(modules)
            .ok()
            .and_then(|m| m.checked_add(border.checked_mul(2)?))
            .and_then(|m| m.checked_mul(module_size))
            .ok_or(TicketError::TooLarge)?;

        let mut image = GrayImage::from_pixel(side, side, LIGHT);
        let colors = code.to_colors();

        for (row, y) in colors.chunks(modules).zip(0_u32..) {
            for (color, x) in row.iter().zip(0_u32..) {
                if *color != Color::Dark {
                    continue;
                }
                let left = (x + border) * module_size;
                let top = (y + border) * module_size;
                for dy in 0..module_size {
                    for dx in 0..module_size {
                        image.put_pixel(left + dx, top + dy, DARK);
                    }
                }
            }
        }

        Ok(image)
    }
}

/// Base64 form stored on orders.
#[must_use]
pub fn to_portable_string(png: &[u8]) -> String {
    STANDARD.encode(png)
}

/// Inverse of [`to_portable_string`].
///
/// # Errors
///
/// Returns `TicketError::Base64` for malformed input.
pub fn from_portable_string(ticket: &str) -> Result<Vec<u8>, TicketError> {
    Ok(STANDARD.decode(ticket.trim())?)
}

/// Read the text encoded in a ticket PNG.
///
/// # Errors
///
/// Returns `TicketError::Image` if the bytes are not a PNG,
/// `TicketError::NoCode` if no QR code is found, or `TicketError::Decode`
/// if the code is damaged.
pub fn read_png(png: &[u8]) -> Result<String, TicketError> {
    let image = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_luma8();
    let width = usize::try_from(image.width()).map_err(|_| TicketError::TooLarge)?;
    let height = usize::try_from(image.height()).map_err(|_| TicketError::TooLarge)?;
    let raw = image.as_raw();

    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
        raw.get(y * width + x).copied().unwrap_or(LIGHT.0[0])
    });

    let grid = prepared
        .detect_grids()
        .into_iter()
        .next()
        .ok_or(TicketError::NoCode)?;
    let (_meta, content) = grid
        .decode()
        .map_err(|e| TicketError::Decode(e.to_string()))?;
    Ok(content)
}

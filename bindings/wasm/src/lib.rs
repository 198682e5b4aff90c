use serde::Deserialize;
use wasm_bindgen::prelude::*;

use pixelkit::geometry::Space;
use pixelkit::{
    DisplayRect, DisplaySize, EncodedImage, ImageProcessor, OutputFormat, PixelKitError, Rect,
};

/// Encoding options, passed as a JavaScript object.
///
/// All fields are optional; each operation applies its own defaults.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessOptions {
    pub format: Option<String>,
    pub quality: Option<f32>,
}

/// A selection rectangle in displayed CSS pixels.
#[derive(Deserialize)]
struct RectInput {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Rendered size of the image in CSS pixels.
#[derive(Deserialize)]
struct SizeInput {
    width: f64,
    height: f64,
}

/// Create a JS `Error` with a `code` property.
fn make_error(code: &str, message: &str) -> JsValue {
    let err = js_sys::Error::new(message);
    let _ = js_sys::Reflect::set(&err, &"code".into(), &JsValue::from_str(code));
    JsValue::from(err)
}

/// Convert a `PixelKitError` into a JS `Error` with a machine-readable `code` property.
fn to_js_error(e: PixelKitError) -> JsValue {
    let code = match &e {
        PixelKitError::DecodeError(_) => "DECODE_ERROR",
        PixelKitError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
        PixelKitError::ZeroDimensions => "ZERO_DIMENSIONS",
        PixelKitError::BufferSizeMismatch { .. } => "BUFFER_SIZE_MISMATCH",
        PixelKitError::EncodeError(_) => "ENCODE_ERROR",
        PixelKitError::InvalidQuality(_) => "INVALID_QUALITY",
    };
    make_error(code, &e.to_string())
}

fn parse_value<T: for<'de> Deserialize<'de>>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid {what}: {e}")))
}

fn parse_options(options: JsValue) -> Result<ProcessOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(ProcessOptions::default())
    } else {
        parse_value(options, "options")
    }
}

/// Decode `input` and attach the progress callback, if any.
fn new_processor(
    input: &[u8],
    on_progress: Option<js_sys::Function>,
) -> Result<ImageProcessor, JsValue> {
    let mut processor = ImageProcessor::new(input).map_err(to_js_error)?;
    if let Some(callback) = on_progress {
        processor = processor.on_progress(move |percent| {
            // A throwing callback must not abort the operation.
            let _ = callback.call1(&JsValue::NULL, &JsValue::from(percent));
        });
    }
    Ok(processor)
}

/// Apply parsed encoding options to a processor.
fn apply_options(
    mut processor: ImageProcessor,
    opts: &ProcessOptions,
) -> Result<ImageProcessor, JsValue> {
    if let Some(ref fmt) = opts.format {
        let format: OutputFormat = fmt.parse().map_err(to_js_error)?;
        processor = processor.format(format);
    }
    if let Some(q) = opts.quality {
        processor = processor.quality(q);
    }
    Ok(processor)
}

/// Build a plain JS object from an `EncodedImage`.
fn build_image_object(image: &EncodedImage) -> Result<JsValue, JsValue> {
    let obj = js_sys::Object::new();
    let data = js_sys::Uint8Array::from(&image.data[..]);
    js_sys::Reflect::set(&obj, &"data".into(), &data)?;
    js_sys::Reflect::set(
        &obj,
        &"mimeType".into(),
        &JsValue::from_str(image.mime_type()),
    )?;
    js_sys::Reflect::set(
        &obj,
        &"format".into(),
        &JsValue::from_str(image.format.extension()),
    )?;
    js_sys::Reflect::set(&obj, &"width".into(), &JsValue::from(image.width))?;
    js_sys::Reflect::set(&obj, &"height".into(), &JsValue::from(image.height))?;
    Ok(JsValue::from(obj))
}

fn build_rect_object<S: Space>(rect: &Rect<S>) -> Result<JsValue, JsValue> {
    let obj = js_sys::Object::new();
    js_sys::Reflect::set(&obj, &"x".into(), &JsValue::from(rect.x))?;
    js_sys::Reflect::set(&obj, &"y".into(), &JsValue::from(rect.y))?;
    js_sys::Reflect::set(&obj, &"width".into(), &JsValue::from(rect.width))?;
    js_sys::Reflect::set(&obj, &"height".into(), &JsValue::from(rect.height))?;
    js_sys::Reflect::set(&obj, &"space".into(), &JsValue::from_str(S::NAME))?;
    Ok(JsValue::from(obj))
}

/// Turn a pointer drag over the rendered image into a selection rectangle.
///
/// Both points are clamped to the image, and the rectangle is normalized so
/// dragging in any direction works. Pass the result to `cropImage`.
///
/// @param startX, startY - Where the drag began, in displayed pixels
/// @param currentX, currentY - Current pointer position
/// @param displaySize - `{ width, height }` the image is rendered at
/// @returns `{ x, y, width, height, space: "display" }`
#[wasm_bindgen(js_name = "selectionFromDrag")]
pub fn selection_from_drag(
    start_x: f64,
    start_y: f64,
    current_x: f64,
    current_y: f64,
    display_size: JsValue,
) -> Result<JsValue, JsValue> {
    let size: SizeInput = parse_value(display_size, "displaySize")?;
    let rect = DisplayRect::from_drag(
        (start_x, start_y),
        (current_x, current_y),
        DisplaySize::new(size.width, size.height),
    );
    build_rect_object(&rect)
}

/// Find the bounding box of the main subject.
///
/// @param input - Raw image bytes (PNG, JPEG, WebP, GIF or BMP)
/// @param options - Unused and not read; accepted for a uniform call shape
/// @param onProgress - Optional `(percent) => void`
/// @returns `{ x, y, width, height, space: "natural" }` or `null`
#[wasm_bindgen(js_name = "detectSubject")]
pub fn detect_subject(
    input: Vec<u8>,
    _options: JsValue,
    on_progress: Option<js_sys::Function>,
) -> Result<JsValue, JsValue> {
    let mut processor = new_processor(&input, on_progress)?;

    match processor.detect_subject() {
        Some(rect) => build_rect_object(&rect),
        None => Ok(JsValue::NULL),
    }
}

/// Crop a selection drawn on the image as rendered in the page.
///
/// @param input - Raw image bytes
/// @param rect - `{ x, y, width, height }` in displayed pixels
/// @param displaySize - `{ width, height }` the image is rendered at
/// @param options - Optional object with fields: format, quality
/// @param onProgress - Optional `(percent) => void`
/// @returns The encoded crop, or `null` when the selection is rejected
#[wasm_bindgen(js_name = "cropImage")]
pub fn crop_image(
    input: Vec<u8>,
    rect: JsValue,
    display_size: JsValue,
    options: JsValue,
    on_progress: Option<js_sys::Function>,
) -> Result<JsValue, JsValue> {
    let rect: RectInput = parse_value(rect, "rect")?;
    let size: SizeInput = parse_value(display_size, "displaySize")?;
    let opts = parse_options(options)?;
    let processor = new_processor(&input, on_progress)?;
    let mut processor = apply_options(processor, &opts)?;

    let cropped = processor
        .crop(
            DisplayRect::new(rect.x, rect.y, rect.width, rect.height),
            DisplaySize::new(size.width, size.height),
        )
        .map_err(to_js_error)?;

    match cropped {
        Some(image) => build_image_object(&image),
        None => Ok(JsValue::NULL),
    }
}

/// Make light background pixels transparent. Always returns PNG.
///
/// @param input - Raw image bytes
/// @param options - Unused and not read; the output is always PNG
/// @param onProgress - Optional `(percent) => void`
#[wasm_bindgen(js_name = "removeBackground")]
pub fn remove_background(
    input: Vec<u8>,
    _options: JsValue,
    on_progress: Option<js_sys::Function>,
) -> Result<JsValue, JsValue> {
    let processor = new_processor(&input, on_progress)?;
    let result = processor.remove_background().map_err(to_js_error)?;
    build_image_object(&result)
}

/// Re-encode an image in another format.
///
/// @param input - Raw image bytes
/// @param options - Optional object with fields: format (`png`, `jpeg`,
///   `webp`, `avif` or a MIME type), quality
/// @param onProgress - Optional `(percent) => void`
#[wasm_bindgen(js_name = "convertImage")]
pub fn convert_image(
    input: Vec<u8>,
    options: JsValue,
    on_progress: Option<js_sys::Function>,
) -> Result<JsValue, JsValue> {
    let opts = parse_options(options)?;
    let processor = new_processor(&input, on_progress)?;
    let mut processor = apply_options(processor, &opts)?;
    let result = processor.convert().map_err(to_js_error)?;
    build_image_object(&result)
}

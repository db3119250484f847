//! Platform abstraction layer
//!
//! Browser glue for:
//! - Canvas lookup and backing-store sizing
//! - Animation frame scheduling
//! - User notification

/// Device pixel ratio clamped to the quality preset's limit
pub fn effective_pixel_ratio(device_ratio: f64, max_ratio: f64) -> f64 {
    if device_ratio.is_finite() && device_ratio > 0.0 {
        device_ratio.min(max_ratio)
    } else {
        1.0
    }
}

/// Backing-store size for a CSS-sized canvas, never smaller than 1x1
pub fn backing_size(client_width: i32, client_height: i32, pixel_ratio: f64) -> (u32, u32) {
    let scale = |v: i32| ((v.max(0) as f64 * pixel_ratio).round() as u32).max(1);
    (scale(client_width), scale(client_height))
}

#[cfg(target_arch = "wasm32")]
pub mod web {
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, Window};

    use crate::error::GameError;

    pub fn window() -> Result<Window, GameError> {
        web_sys::window().ok_or(GameError::MissingDependency("window"))
    }

    /// Find the `<canvas>` with `id`
    pub fn canvas(id: &str) -> Result<HtmlCanvasElement, GameError> {
        let document = window()?
            .document()
            .ok_or(GameError::MissingDependency("document"))?;
        document
            .get_element_by_id(id)
            .ok_or_else(|| GameError::Canvas(format!("no element with id '{id}'")))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| GameError::Canvas(format!("'{id}' is not a canvas")))
    }

    /// Resize the canvas backing store to its CSS size times the pixel ratio.
    /// Returns the new size in pixels.
    pub fn fit_canvas(canvas: &HtmlCanvasElement, max_pixel_ratio: f64) -> (u32, u32) {
        let device_ratio = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0);
        let ratio = super::effective_pixel_ratio(device_ratio, max_pixel_ratio);
        let (width, height) =
            super::backing_size(canvas.client_width(), canvas.client_height(), ratio);
        canvas.set_width(width);
        canvas.set_height(height);
        (width, height)
    }

    /// Show a blocking browser alert
    pub fn alert(message: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(message);
        }
    }

    /// Run `callback` on the next display refresh
    pub fn request_animation_frame(callback: impl FnOnce(f64) + 'static) {
        let Some(window) = web_sys::window() else {
            log::error!("No window to schedule frames on");
            return;
        };
        let closure = Closure::once(callback);
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_ratio_is_clamped() {
        assert_eq!(effective_pixel_ratio(3.0, 2.0), 2.0);
        assert_eq!(effective_pixel_ratio(1.5, 2.0), 1.5);
        assert_eq!(effective_pixel_ratio(0.0, 2.0), 1.0);
        assert_eq!(effective_pixel_ratio(f64::NAN, 2.0), 1.0);
    }

    #[test]
    fn test_backing_size() {
        assert_eq!(backing_size(800, 600, 2.0), (1600, 1200));
        assert_eq!(backing_size(0, 0, 2.0), (1, 1));
        assert_eq!(backing_size(101, 51, 1.5), (152, 77));
    }
}

//! Process-wide layout parameters.
//!
//! The stage refreshes them on every resize; acts read the UI scale factor
//! `k` and the `indent` size when docking content and auto-scrolling.

use std::cell::Cell;

/// Window size the UI is designed for; `k == 1.0` at this size.
pub const REFERENCE_WIDTH: f32 = 1280.0;
pub const REFERENCE_HEIGHT: f32 = 720.0;

/// Indent at `k == 1.0`.
pub const BASE_INDENT: f32 = 96.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    pub k: f32,
    pub indent: f32,
}

impl Parameters {
    pub fn for_window(width: f32, height: f32) -> Self {
        let k = (width / REFERENCE_WIDTH).min(height / REFERENCE_HEIGHT);
        Self {
            k,
            indent: BASE_INDENT * k,
        }
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::for_window(REFERENCE_WIDTH, REFERENCE_HEIGHT)
    }
}

thread_local! {
    static CURRENT: Cell<Parameters> = Cell::new(Parameters::default());
}

/// Recompute the parameters for a new window size.
pub fn update(width: f32, height: f32) {
    CURRENT.with(|c| c.set(Parameters::for_window(width, height)));
}

pub fn get() -> Parameters {
    CURRENT.with(Cell::get)
}

/// Current UI scale factor.
pub fn k() -> f32 {
    get().k
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_size_is_unit_scale() {
        let p = Parameters::default();
        assert_eq!(p.k, 1.0);
        assert_eq!(p.indent, BASE_INDENT);
    }

    #[test]
    fn test_scale_follows_smaller_axis() {
        let p = Parameters::for_window(2560.0, 720.0);
        assert_eq!(p.k, 1.0);

        let p = Parameters::for_window(640.0, 720.0);
        assert_eq!(p.k, 0.5);
        assert_eq!(p.indent, 48.0);
    }

    #[test]
    fn test_update_is_visible_on_thread() {
        update(640.0, 360.0);
        assert_eq!(k(), 0.5);
        assert_eq!(get().indent, 48.0);
        update(REFERENCE_WIDTH, REFERENCE_HEIGHT);
    }
}

//! Centralized constants used across the application.
//!
//! This module contains magic numbers and configuration values that are used
//! in multiple places or would benefit from being named constants.

/// Default window width in pixels
pub const DEFAULT_WINDOW_WIDTH: f32 = 1400.0;

/// Default window height in pixels
pub const DEFAULT_WINDOW_HEIGHT: f32 = 900.0;

/// How long a press must be held before it turns into a pan, in seconds
pub const LONG_PRESS_SECS: f32 = 0.35;

/// Pointer movement (screen px) that cancels a pending long press
pub const JITTER_THRESHOLD_PX: f32 = 6.0;

/// Drawn rectangles smaller than this (screen px) in either axis are
/// treated as accidental taps and discarded
pub const MIN_MASK_DRAW_PX: f32 = 8.0;

/// Minimum normalized size of a stored mask, prevents invisible regions
pub const MIN_MASK_NORM_SIZE: f32 = 0.0005;

/// Pinch distance change (screen px) before a pinch counts as movement
pub const PINCH_MOVE_THRESHOLD_PX: f32 = 2.0;

/// Zoom range relative to the fit zoom: [0.6 x fit, 6 x fit]
pub const MIN_ZOOM_FIT_FACTOR: f32 = 0.6;
pub const MAX_ZOOM_FIT_FACTOR: f32 = 6.0;

/// Absolute floors for the zoom range, whatever the fit zoom is
pub const MIN_ZOOM_FLOOR: f32 = 0.1;
pub const MAX_ZOOM_FLOOR: f32 = 2.5;

/// Step applied by the zoom in/out buttons and the mouse wheel
pub const ZOOM_BUTTON_STEP: f32 = 1.25;
pub const WHEEL_ZOOM_STEP: f32 = 1.1;

/// Imported images wider than this are downscaled before storage
pub const IMPORT_MAX_WIDTH: u32 = 1600;

/// JPEG quality used when re-encoding imported images
pub const IMPORT_JPEG_QUALITY: u8 = 80;

/// One day in milliseconds, the scheduler's interval unit
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

//! Pipeline stages for grading handwriting and analyzing text.
//!
//! Each submodule implements exactly one transformation step and is
//! independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! encode ──▶ gateway ──▶ gateway ──▶ normalize ──▶ annotate
//! (base64)   (extract)   (correct)   (table)       (highlight / superscript)
//! ```
//!
//! 1. [`encode`]    — load an uploaded image as a base64 data payload; also
//!    verifies that report images still decode
//! 2. [`gateway`]   — the language-model seam; the only stage with network I/O
//! 3. [`normalize`] — loosely structured correction output → error table
//! 4. [`annotate`]  — highlight spans for the screen, superscripts for print
//! 5. [`analyze`]   — independent free-text metrics and suggestions

pub mod analyze;
pub mod annotate;
pub mod encode;
pub mod gateway;
pub mod normalize;

//! Pipeline stages for document-to-PDF standardization.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different typesetting backend) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ mathfix ──▶ relocate ──▶ render ──▶ compile
//! (pandoc)    (regex)     (store)      (template)  (pandoc+latex)
//! ```
//!
//! 1. [`extract`]  — drive the document converter; collect markup + images
//! 2. [`mathfix`]  — normalize over-escaped math delimiters in the markup
//! 3. [`relocate`] — upload extracted images, rewrite their references
//! 4. [`render`]   — merge metadata + markup into a typesettable source
//! 5. [`compile`]  — drive the typesetter to the final PDF; the only
//!    long-running stage, bounded by a timeout

pub mod compile;
pub mod extract;
pub mod mathfix;
pub mod relocate;
pub mod render;

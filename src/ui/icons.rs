//! Shared UI icons and emojis.
//!
//! Each icon falls back to a plain-text marker on terminals without emoji
//! support.

use console::Emoji;

use planpilot_common::Priority;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static KEY: Emoji<'_, '_> = Emoji("🔑 ", "");

// Priority glyphs
pub static PRIORITY_LOW: Emoji<'_, '_> = Emoji("💤", "(low)");
pub static PRIORITY_MEDIUM: Emoji<'_, '_> = Emoji("⌛", "(med)");
pub static PRIORITY_HIGH: Emoji<'_, '_> = Emoji("🔥", "(high)");

// Board indicators
pub static CALENDAR: Emoji<'_, '_> = Emoji("📅 ", "due ");
pub static COLUMN: Emoji<'_, '_> = Emoji("📋 ", "");

pub fn priority(priority: Priority) -> &'static Emoji<'static, 'static> {
    match priority {
        Priority::Low => &PRIORITY_LOW,
        Priority::Medium => &PRIORITY_MEDIUM,
        Priority::High => &PRIORITY_HIGH,
    }
}

//! Emoji used across terminal output, each with a plain-text fallback.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[FAIL]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[INFO]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

pub static DATABASE: Emoji<'_, '_> = Emoji("🗄️  ", "");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static LINK: Emoji<'_, '_> = Emoji("🔗 ", "");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏰ ", "");

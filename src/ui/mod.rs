// ─── Terminal Observers ───
// Render progress events. The core never waits on them.

pub mod dashboard;
pub mod plain;

/// Wrap `text` in a 24-bit foreground color taken from a registry color
/// integer (`0xRRGGBB`). Without a color the text is returned as is.
pub fn colorize(text: &str, color: Option<u32>) -> String {
    match color {
        Some(rgb) => {
            let r = (rgb >> 16) & 0xff;
            let g = (rgb >> 8) & 0xff;
            let b = rgb & 0xff;
            format!("\x1b[38;2;{};{};{}m{}\x1b[0m", r, g, b, text)
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorize_emits_truecolor_escape() {
        assert_eq!(
            colorize("Sodium", Some(0x8bc34a)),
            "\x1b[38;2;139;195;74mSodium\x1b[0m"
        );
    }

    #[test]
    fn colorize_without_color_is_identity() {
        assert_eq!(colorize("Iris", None), "Iris");
    }
}

//! ANSI colour helpers for terminal output

pub mod colors {
    pub const GREY: u8 = 102;      // #7D7D7D - Punctuation, secondary
    pub const ORANGE: u8 = 208;    // #F2913D - Warnings, PUT/PATCH
    pub const RED: u8 = 167;       // #E34F45 - Errors, DELETE
    pub const BLUE: u8 = 68;       // #426BD1 - Names, labels
    pub const GREEN: u8 = 71;      // #63C27A - Success, GET
    pub const YELLOW: u8 = 185;    // #CCCC3D - POST
}

/// ANSI escape code constants
pub const RESET: &str = "\x1b[0m";

/// Whether coloured output should be written to stdout
///
/// Off when forced off, when `NO_COLOR` is set, or when stdout is not a TTY.
pub fn colors_enabled(force_off: bool) -> bool {
    !force_off && std::env::var_os("NO_COLOR").is_none() && atty::is(atty::Stream::Stdout)
}

/// Generate foreground color escape code
#[inline]
pub fn fg(color: u8) -> String {
    format!("\x1b[38;5;{}m", color)
}

/// Generate bold foreground color escape code
#[inline]
pub fn bold_fg(color: u8) -> String {
    format!("\x1b[1;38;5;{}m", color)
}

/// Colorize text with a foreground color
#[inline]
pub fn colorize(text: &str, color: u8) -> String {
    format!("{}{}{}", fg(color), text, RESET)
}

/// Colorize text with bold foreground color
#[inline]
pub fn bold(text: &str, color: u8) -> String {
    format!("{}{}{}", bold_fg(color), text, RESET)
}

/// Success message (green)
#[inline]
pub fn success(text: &str) -> String {
    bold(text, colors::GREEN)
}

/// Error message (red)
#[inline]
pub fn error(text: &str) -> String {
    bold(text, colors::RED)
}

/// Warning message (orange)
#[inline]
pub fn warning(text: &str) -> String {
    bold(text, colors::ORANGE)
}

/// Label/name (blue)
#[inline]
pub fn label(text: &str) -> String {
    colorize(text, colors::BLUE)
}

/// Secondary/muted text (grey)
#[inline]
pub fn muted(text: &str) -> String {
    colorize(text, colors::GREY)
}

/// HTTP method, coloured by verb
pub fn http_method(method: &str) -> String {
    let color = match method.to_uppercase().as_str() {
        "GET" | "HEAD" | "OPTIONS" => colors::GREEN,
        "POST" => colors::YELLOW,
        "PUT" | "PATCH" => colors::ORANGE,
        "DELETE" => colors::RED,
        _ => colors::GREY,
    };
    bold(method, color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fg_color() {
        assert_eq!(fg(71), "\x1b[38;5;71m");
    }

    #[test]
    fn test_colorize() {
        let result = colorize("test", colors::GREEN);
        assert!(result.contains("38;5;71m"));
        assert!(result.contains("test"));
        assert!(result.ends_with(RESET));
    }

    #[test]
    fn test_success_and_error() {
        assert!(success("OK").contains("1;38;5;71m"));
        assert!(error("FAIL").contains("1;38;5;167m"));
    }

    #[test]
    fn test_http_method() {
        assert!(http_method("delete").contains("1;38;5;167m"));
        assert!(http_method("GET").ends_with("GET\x1b[0m"));
    }

    #[test]
    fn test_every_palette_colour_is_rendered() {
        assert!(muted("x").contains(&fg(colors::GREY)));
        assert!(warning("x").contains(&bold_fg(colors::ORANGE)));
        assert!(label("x").contains(&fg(colors::BLUE)));
        assert!(http_method("POST").contains(&bold_fg(colors::YELLOW)));
        assert!(http_method("PUT").contains(&bold_fg(colors::ORANGE)));
        assert!(http_method("TRACE").contains(&bold_fg(colors::GREY)));
    }

    #[test]
    fn test_forced_off() {
        assert!(!colors_enabled(true));
    }
}

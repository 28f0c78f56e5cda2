//! UI utilities for Keylink CLI.

const BOX_PADDING: usize = 4;

/// A formatted box for displaying an issued link.
pub struct LinkBox<'a> {
    url: &'a str,
    expire: Option<String>,
}

impl<'a> LinkBox<'a> {
    /// Create a new link box.
    #[must_use]
    pub const fn new(url: &'a str) -> Self {
        Self { url, expire: None }
    }

    /// Add the remaining lifetime to the box.
    #[must_use]
    pub fn with_expire(mut self, expire: String) -> Self {
        self.expire = Some(expire);
        self
    }

    /// Display the link box to stdout.
    pub fn display(&self) {
        for line in self.render() {
            println!("{line}");
        }
    }

    fn render(&self) -> Vec<String> {
        let expire_line = self.expire.as_ref().map(|e| format!("Expires in {e}"));
        let width = self
            .url
            .chars()
            .count()
            .max(expire_line.as_ref().map_or(0, |l| l.chars().count()))
            + BOX_PADDING;

        let mut lines = vec![
            format!("  ┌{}┐", "─".repeat(width)),
            format!("  │{}│", " ".repeat(width)),
            format!("  │{}│", center_in_box(self.url, width)),
            format!("  │{}│", " ".repeat(width)),
        ];
        if let Some(expire_line) = expire_line {
            lines.push(format!("  │{}│", center_in_box(&expire_line, width)));
            lines.push(format!("  │{}│", " ".repeat(width)));
        }
        lines.push(format!("  └{}┘", "─".repeat(width)));
        lines
    }
}

fn center_in_box(content: &str, width: usize) -> String {
    let content_len = content.chars().count();
    let padding = width.saturating_sub(content_len);
    let left = padding / 2;
    let right = padding - left;
    format!("{}{}{}", " ".repeat(left), content, " ".repeat(right))
}

/// Format a remaining lifetime in seconds as "2d 3h", "5h 12m", "4m", or "expired".
pub fn format_remaining(secs: i64) -> String {
    if secs <= 0 {
        return "expired".to_string();
    }

    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let mins = (secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m", mins)
    } else {
        format!("{}s", secs)
    }
}

/// Shorten a token for table display, keeping both ends.
pub fn abbreviate(token: &str) -> String {
    if token.len() <= 16 || !token.is_ascii() {
        return token.to_string();
    }
    format!("{}…{}", &token[..8], &token[token.len() - 6..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_in_box() {
        let centered = center_in_box("hello", 11);
        assert_eq!(centered, "   hello   ");

        let centered = center_in_box("hi", 6);
        assert_eq!(centered, "  hi  ");
    }

    #[test]
    fn test_link_box_fits_url() {
        let lines = LinkBox::new("http://host/abc")
            .with_expire("1h 0m".into())
            .render();

        let widths: Vec<_> = lines.iter().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{lines:?}");
        assert!(lines.iter().any(|l| l.contains("http://host/abc")));
        assert!(lines.iter().any(|l| l.contains("Expires in 1h 0m")));
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(0), "expired");
        assert_eq!(format_remaining(-5), "expired");
        assert_eq!(format_remaining(42), "42s");
        assert_eq!(format_remaining(300), "5m");
        assert_eq!(format_remaining(3_660), "1h 1m");
        assert_eq!(format_remaining(90_000), "1d 1h");
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("short"), "short");
        let token = "0123456789abcdef".repeat(4);
        assert_eq!(abbreviate(&token), "01234567…abcdef");
    }
}

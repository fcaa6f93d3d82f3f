use ftp_listing::{CompileError, MessageCatalog, ParsedListing, ServerType, Value};

/// ANSI escapes keyed by what they mark in the report.
mod style {
    pub const RESET: &str = "\x1b[0m";
    pub const FAINT: &str = "\x1b[2m";

    pub const FAILURE: &str = "\x1b[31m";
    pub const SUCCESS: &str = "\x1b[32m";
    pub const NAME: &str = "\x1b[1;32m";
    pub const NUMBER: &str = "\x1b[33m";
    pub const CARET: &str = "\x1b[33m";
    pub const STAMP: &str = "\x1b[34m";
    pub const SERVER_TYPE: &str = "\x1b[1;36m";
    pub const HEADER: &str = "\x1b[90m";
}

pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(&self, s: impl AsRef<str>, code: &str) -> String {
        if !self.enabled {
            return s.as_ref().to_string();
        }
        format!("{code}{}{}", s.as_ref(), style::RESET)
    }
}

pub fn print_ok(message: &str, palette: &Palette) {
    println!("{}", palette.paint(format!("✓ {message}"), style::SUCCESS));
}

pub fn print_failure(message: &str, palette: &Palette) {
    eprintln!("{}", palette.paint(format!("✗ {message}"), style::FAILURE));
}

/// Print the diagnostic text and, when it has one, the offending line of
/// `source` with a caret under the offset.
pub fn print_diagnostic(source: &str, err: &CompileError, catalog: &dyn MessageCatalog, palette: &Palette) {
    let text = err.describe(catalog);
    let Some(offset) = err.offset() else {
        print_failure(&text, palette);
        return;
    };
    print_failure(&format!("{text} (offset {offset})"), palette);

    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    let line_beg = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[offset..].find('\n').map_or(source.len(), |i| offset + i);
    let line_no = source[..line_beg].matches('\n').count() + 1;
    let column = source[line_beg..offset].chars().count();

    let gutter = format!("{line_no:>4} │ ");
    println!("{}{}", palette.paint(&gutter, style::FAINT), source[line_beg..line_end].trim_end_matches('\r'));
    println!("{}{}", " ".repeat(gutter.chars().count() + column), palette.paint("^", style::CARET));
}

pub fn print_listing(server_type: &ServerType, parsed: &ParsedListing, palette: &Palette) {
    println!(
        "\n{}",
        palette.paint(
            format!("⚙  {} ({} items, months: {:?})", server_type.name(), parsed.items.len(), parsed.languages),
            style::SERVER_TYPE
        )
    );

    let headers: Vec<&str> = server_type.columns().iter().map(|c| c.id.as_str()).collect();
    println!("{}", palette.paint(format!("  {}  {}", "flags", headers.join(" │ ")), style::HEADER));

    for item in &parsed.items {
        let flags: String = [(item.is_dir, 'd'), (item.is_link, 'l'), (item.is_hidden, 'h')]
            .iter()
            .map(|(set, c)| if *set { *c } else { '-' })
            .collect();
        let cells: Vec<String> = item
            .values
            .iter()
            .enumerate()
            .map(|(i, value)| match value {
                Value::Text(_) if i == 0 => palette.paint(value.to_string(), style::NAME),
                Value::Size(_) | Value::Number(_) => palette.paint(value.to_string(), style::NUMBER),
                Value::Date(_) | Value::Time(_) => palette.paint(value.to_string(), style::STAMP),
                Value::Empty => palette.paint("·", style::FAINT),
                Value::Text(_) => value.to_string(),
            })
            .collect();
        println!("  {}  {}", palette.paint(flags, style::FAINT), cells.join(palette.paint(" │ ", style::FAINT).as_str()));
        if let Some(last_write) = item.last_write {
            println!("         {}", palette.paint(format!("last write {last_write}"), style::FAINT));
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_marks_roles_only_when_enabled() {
        assert_eq!(Palette::new(false).paint("notes.txt", style::NAME), "notes.txt");
        assert_eq!(Palette::new(true).paint("1234", style::NUMBER), "\x1b[33m1234\x1b[0m");
    }
}

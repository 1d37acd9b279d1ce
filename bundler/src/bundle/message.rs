use colored::Colorize;
use std::fmt::Write;

/// A build diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    /// Name of the plugin that produced the message, if any.
    pub plugin_name: Option<&'static str>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    /// 1-based.
    pub line: usize,
    /// 0-based, in characters.
    pub column: usize,
    pub line_text: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FormatMessagesOptions {
    pub color: bool,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            plugin_name: None,
            location: None,
        }
    }

    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    pub fn with_plugin(mut self, name: &'static str) -> Self {
        self.plugin_name = Some(name);
        self
    }
}

/// Renders messages into human readable reports, one string per message.
pub fn format_messages(messages: &[Message], options: FormatMessagesOptions) -> Vec<String> {
    messages
        .iter()
        .map(|message| format_message(message, options))
        .collect()
}

fn format_message(message: &Message, options: FormatMessagesOptions) -> String {
    let paint = |s: String, f: fn(&str) -> colored::ColoredString| -> String {
        if options.color {
            f(&s).to_string()
        } else {
            s
        }
    };

    let mut out = String::new();
    let text = match message.plugin_name {
        Some(name) => format!("[plugin {name}] {}", message.text),
        None => message.text.clone(),
    };
    let _ = writeln!(
        out,
        "{} {}",
        paint("error:".to_string(), |s| s.red().bold()),
        paint(text, |s| s.bold())
    );

    if let Some(loc) = &message.location {
        let gutter = loc.line.to_string().len();
        let pad = " ".repeat(gutter);
        let _ = writeln!(
            out,
            "{pad}{} {}:{}:{}",
            paint("-->".to_string(), |s| s.blue().bold()),
            loc.file,
            loc.line,
            loc.column
        );
        let bar = paint("|".to_string(), |s| s.blue().bold());
        let _ = writeln!(out, "{pad} {bar}");
        let _ = writeln!(
            out,
            "{} {bar} {}",
            paint(loc.line.to_string(), |s| s.blue().bold()),
            loc.line_text
        );
        let caret = format!("{}^", " ".repeat(loc.column));
        let _ = writeln!(out, "{pad} {bar} {}", paint(caret, |s| s.red().bold()));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_message_without_color_should_work() {
        let message = Message::new("Could not resolve \"./missing\"").with_location(Some(Location {
            file: "a.test.ts".into(),
            line: 3,
            column: 7,
            line_text: "import \"./missing\";".into(),
        }));

        let ret = format_messages(&[message], FormatMessagesOptions { color: false });
        assert_eq!(
            ret[0],
            concat!(
                "error: Could not resolve \"./missing\"\n",
                " --> a.test.ts:3:7\n",
                "  |\n",
                "3 | import \"./missing\";\n",
                "  |        ^\n",
            )
        );
    }

    #[test]
    fn format_message_should_name_plugin() {
        let message = Message::new("boom").with_plugin("inject __dirname");
        let ret = format_messages(&[message], Default::default());
        assert_eq!(ret[0], "error: [plugin inject __dirname] boom\n");
    }
}

use std::borrow::Cow;

use yansi::{Color, Style};

use super::{logger::Config, LogEvent, LogFormatter, Rendered};

/// Width the title is centered in.
pub const TITLE_WIDTH: usize = 25;

const RESET: &str = "\x1b[0m";

pub struct DefaultFormatter {
    config: Config,
}

impl DefaultFormatter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn timestamp(&self, event: &LogEvent) -> String {
        event
            .timestamp
            .format(&self.config.datetime_format)
            .to_string()
    }

    fn color(&self, color: Color) -> Cow<'static, str> {
        if self.config.use_ansi {
            Style::new().fg(color).prefix()
        } else {
            Cow::Borrowed("")
        }
    }

    fn reset(&self) -> &str {
        if self.config.use_ansi {
            RESET
        } else {
            ""
        }
    }
}

impl LogFormatter for DefaultFormatter {
    fn render(&self, event: &LogEvent) -> Rendered {
        let code = event.level.code;
        let time = self.timestamp(event);
        let title = center(&event.title, TITLE_WIDTH);

        let header = format!("{} [{}][{}]", code, time, title);
        let spacing = " ".repeat(header.chars().count());

        let level_color = self.color(event.level.text_color);
        let time_color = self.color(Color::Cyan);
        let title_color = self.color(Color::BrightMagenta);

        let mut lines = event.message.split('\n').map(|l| l.trim_end_matches('\r'));
        let first = lines.next().unwrap_or_default();

        let mut file = format!("{} {}", header, first);
        let mut console = format!(
            "{}{} {}[{}]{}[{}] {}{}",
            level_color, code, time_color, time, title_color, title, level_color, first
        );

        for line in lines {
            file.push_str(&format!("\n{} {}", spacing, line));
            console.push_str(&format!("\n{} {}{}", spacing, level_color, line));
        }

        console.push_str(self.reset());

        Rendered { file, console }
    }
}

/// Centers `text` in `width` columns. An odd remainder goes to the left
/// when `width` is odd, to the right otherwise.
pub fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }

    let pad = width - len;
    let left = pad / 2 + (pad & width & 1);

    format!("{}{}{}", " ".repeat(left), text, " ".repeat(pad - left))
}

//! Plain-text presenter for terminals.

use textwrap::core::display_width;

use crate::view::{ChatView, GroupView, Side, EMPTY_HINT};

const MIN_WIDTH: usize = 24;
const BUBBLE_SHARE_PERCENT: usize = 70;

pub fn render_preview(view: &ChatView, width: usize) -> String {
    let width = width.max(MIN_WIDTH);
    let mut out = String::new();

    let header = format!(
        "[{}] {} · {}",
        view.header.initial, view.header.title, view.header.status
    );
    push_line(&mut out, &header);
    push_line(&mut out, &"─".repeat(width));

    if view.is_empty() {
        push_line(&mut out, EMPTY_HINT);
        return out;
    }

    let bubble_cols = (width * BUBBLE_SHARE_PERCENT / 100).max(8);
    for (index, group) in view.groups.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        render_group(&mut out, group, width, bubble_cols);
    }

    out
}

fn render_group(out: &mut String, group: &GroupView, width: usize, bubble_cols: usize) {
    if group.side == Side::Left {
        push_line(out, &group.display_name);
    }

    for bubble in &group.bubbles {
        let lines = wrap_text(&bubble.text, bubble_cols);
        let time = bubble.time_label.as_deref();
        let inner = lines
            .iter()
            .map(|line| display_width(line))
            .chain(time.map(display_width))
            .max()
            .unwrap_or(0);

        let mut rows = lines
            .iter()
            .map(|line| format!("{line}{}", spaces(inner, line)))
            .collect::<Vec<_>>();
        if let Some(time) = time {
            rows.push(format!("{}{time}", spaces(inner, time)));
        }

        for padded in rows {
            let rendered = match group.side {
                Side::Left => format!("│ {padded}"),
                Side::Right => {
                    let body = format!("{padded} │");
                    format!("{}{body}", spaces(width, &body))
                }
            };
            push_line(out, rendered.trim_end());
        }
    }
}

/// Word wrap by display width. Words longer than `cols` are split.
pub fn wrap_text(text: &str, cols: usize) -> Vec<String> {
    let options =
        textwrap::Options::new(cols.max(1)).wrap_algorithm(textwrap::WrapAlgorithm::FirstFit);
    let mut lines = textwrap::wrap(text, options)
        .into_iter()
        .map(|line| line.into_owned())
        .collect::<Vec<_>>();
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Padding that brings `text` up to `cols` terminal columns.
fn spaces(cols: usize, text: &str) -> String {
    " ".repeat(cols.saturating_sub(display_width(text)))
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use textwrap::core::display_width;

    use super::{render_preview, wrap_text};
    use crate::group::group_messages;
    use crate::script::parse_conversation;
    use crate::session::{DisplaySettings, Participant};
    use crate::view::{ChatView, EMPTY_HINT};

    fn view_for(script: &str) -> ChatView {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 8, 30, 0)
            .unwrap();
        let groups = group_messages(&parse_conversation(script, now));
        ChatView::build(
            &groups,
            &Participant::named("Alice"),
            &Participant::named("Bob"),
            DisplaySettings::default(),
        )
    }

    #[test]
    fn wrap_breaks_on_words_and_splits_long_words() {
        assert_eq!(wrap_text("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn preview_aligns_sides_and_shows_times_once_per_run() {
        let preview = render_preview(&view_for("< hey\n> yo\n> sup (22:12)"), 40);
        let lines = preview.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "[B] Bob · online");
        assert_eq!(lines[2], "Bob");
        assert!(lines[3].starts_with("│ hey"));
        assert!(lines.iter().any(|line| line.ends_with("yo │") && line.starts_with(' ')));
        assert_eq!(preview.matches("22:12").count(), 1);
        assert_eq!(preview.matches("08:30").count(), 1);
    }

    #[test]
    fn wide_characters_stay_inside_the_width() {
        let width = 30;
        let preview = render_preview(&view_for("> 你好你好你好你好你好你好你好\n> 🎉🎉 party"), width);
        for line in preview.lines().skip(2) {
            assert!(
                display_width(line) <= width,
                "{line:?} is wider than {width} columns"
            );
        }
        let right = preview
            .lines()
            .filter(|line| line.ends_with('│'))
            .collect::<Vec<_>>();
        assert!(right.len() >= 3);
        assert!(right.iter().all(|line| display_width(line) == width));
    }

    #[test]
    fn empty_view_shows_hint() {
        let preview = render_preview(&view_for(""), 40);
        assert!(preview.contains(EMPTY_HINT));
    }
}

use std::path::PathBuf;

use serde::Serialize;

use crate::group::MessageGroup;
use crate::platform::{Appearance, Palette, Platform};
use crate::script::Role;
use crate::session::{DisplaySettings, Participant};

pub const EMPTY_HINT: &str = "Start typing in the script to see your conversation here!";
pub const INPUT_PLACEHOLDER: &str = "Type a message...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl From<Role> for Side {
    fn from(role: Role) -> Self {
        match role {
            Role::Sender => Side::Right,
            Role::Receiver => Side::Left,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderView {
    pub title: String,
    pub status: String,
    pub initial: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BubbleView {
    pub text: String,
    pub is_first: bool,
    pub is_last: bool,
    /// Only set on the last bubble of a run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupView {
    pub role: Role,
    pub side: Side,
    pub display_name: String,
    pub initial: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<PathBuf>,
    pub bubbles: Vec<BubbleView>,
}

/// Everything a presenter needs to draw one conversation. Role-to-name
/// resolution happens here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatView {
    pub platform: Platform,
    pub appearance: Appearance,
    pub mobile: bool,
    pub header: HeaderView,
    pub groups: Vec<GroupView>,
    #[serde(skip)]
    pub palette: Palette,
}

impl ChatView {
    pub fn build(
        groups: &[MessageGroup],
        sender: &Participant,
        receiver: &Participant,
        display: DisplaySettings,
    ) -> Self {
        let groups = groups
            .iter()
            .map(|group| {
                let participant = match group.role {
                    Role::Sender => sender,
                    Role::Receiver => receiver,
                };
                let bubbles = group
                    .messages
                    .iter()
                    .enumerate()
                    .map(|(index, message)| BubbleView {
                        text: message.text.clone(),
                        is_first: group.is_first(index),
                        is_last: group.is_last(index),
                        time_label: group
                            .is_last(index)
                            .then(|| display.time_format.format(&message.timestamp)),
                    })
                    .collect();

                GroupView {
                    role: group.role,
                    side: Side::from(group.role),
                    display_name: participant.name.clone(),
                    initial: participant.initial(),
                    photo: participant.photo.clone(),
                    bubbles,
                }
            })
            .collect();

        Self {
            platform: display.platform,
            appearance: display.appearance,
            mobile: display.mobile,
            header: HeaderView {
                title: receiver.name.clone(),
                status: display.platform.status_text().to_owned(),
                initial: receiver.initial(),
                photo: receiver.photo.clone(),
            },
            groups,
            palette: display.platform.palette(display.appearance),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn bubble_count(&self) -> usize {
        self.groups.iter().map(|group| group.bubbles.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::{ChatView, Side};
    use crate::group::group_messages;
    use crate::platform::{Platform, TimeFormat};
    use crate::script::parse_conversation;
    use crate::session::{DisplaySettings, Participant};

    fn view_for(script: &str, display: DisplaySettings) -> ChatView {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 8, 30, 0)
            .unwrap();
        let groups = group_messages(&parse_conversation(script, now));
        ChatView::build(
            &groups,
            &Participant::named("alice"),
            &Participant::named("Bob"),
            display,
        )
    }

    #[test]
    fn time_label_only_on_last_bubble_of_each_run() {
        let view = view_for("> a\n> b (21:07)\n< c", DisplaySettings::default());
        assert_eq!(view.groups.len(), 2);
        let sender = &view.groups[0];
        assert_eq!(sender.side, Side::Right);
        assert_eq!(sender.bubbles[0].time_label, None);
        assert_eq!(sender.bubbles[1].time_label.as_deref(), Some("21:07"));
        assert_eq!(view.groups[1].bubbles[0].time_label.as_deref(), Some("21:07"));
        assert_eq!(view.bubble_count(), 3);
    }

    #[test]
    fn names_resolve_at_view_time() {
        let display = DisplaySettings {
            platform: Platform::Instagram,
            time_format: TimeFormat::TwelveHour,
            ..DisplaySettings::default()
        };
        let view = view_for("< hi", display);
        assert_eq!(view.header.title, "Bob");
        assert_eq!(view.header.status, "Active now");
        assert_eq!(view.groups[0].display_name, "Bob");
        assert_eq!(view.groups[0].bubbles[0].time_label.as_deref(), Some("08:30 AM"));
    }

    #[test]
    fn empty_script_yields_empty_view() {
        let view = view_for("just notes", DisplaySettings::default());
        assert!(view.is_empty());
        assert_eq!(view.header.initial, "B");
    }
}

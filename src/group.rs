use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::script::{Message, Role};

/// A maximal run of consecutive messages sharing a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageGroup {
    pub role: Role,
    pub messages: Vec<Message>,
}

impl MessageGroup {
    fn start(message: Message) -> Self {
        Self {
            role: message.role,
            messages: vec![message],
        }
    }

    /// Groups are never empty, so this is the first message's timestamp.
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.messages.first().map(|message| message.timestamp)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_first(&self, index: usize) -> bool {
        index == 0
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.messages.len()
    }
}

pub fn group_messages(messages: &[Message]) -> Vec<MessageGroup> {
    let mut groups: Vec<MessageGroup> = Vec::new();

    for message in messages {
        match groups.last_mut() {
            Some(current) if current.role == message.role => current.messages.push(message.clone()),
            _ => groups.push(MessageGroup::start(message.clone())),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::group_messages;
    use crate::script::{parse_conversation, Role};

    #[test]
    fn consecutive_roles_merge_and_changes_split() {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .unwrap();
        let messages = parse_conversation("> one\n> two\n< three\n> four", now);
        let groups = group_messages(&messages);

        let sizes = groups.iter().map(|g| g.len()).collect::<Vec<_>>();
        let roles = groups.iter().map(|g| g.role).collect::<Vec<_>>();
        assert_eq!(sizes, vec![2, 1, 1]);
        assert_eq!(roles, vec![Role::Sender, Role::Receiver, Role::Sender]);
        assert!(groups[0].is_first(0));
        assert!(groups[0].is_last(1));
        assert!(!groups[0].is_last(0));
    }

    #[test]
    fn group_timestamp_is_first_message_timestamp() {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .unwrap();
        let messages = parse_conversation("< a (10:00)\n< b (11:30)\n> c", now);
        let groups = group_messages(&messages);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].timestamp(), Some(messages[0].timestamp));
        assert_eq!(groups[0].messages[1].timestamp, messages[1].timestamp);
        assert_eq!(groups[1].timestamp(), Some(messages[1].timestamp));
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_messages(&[]).is_empty());
    }
}

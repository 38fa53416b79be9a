use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};

use crate::group::{group_messages, MessageGroup};
use crate::platform::{Appearance, Platform, TimeFormat};
use crate::script::{parse_conversation_with_mode, Message, ParseMode, Role};
use crate::view::ChatView;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<PathBuf>,
}

impl Participant {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            photo: None,
        }
    }

    /// Avatar fallback letter.
    pub fn initial(&self) -> String {
        self.name
            .trim()
            .chars()
            .next()
            .map(|ch| ch.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_owned())
    }
}

pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ScriptChanged(String),
    SenderNameChanged(String),
    ReceiverNameChanged(String),
    SenderPhotoChanged(Option<PathBuf>),
    ReceiverPhotoChanged(Option<PathBuf>),
    PlatformChanged(Platform),
    AppearanceToggled,
    MobileModeToggled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplaySettings {
    pub platform: Platform,
    pub appearance: Appearance,
    pub mobile: bool,
    pub time_format: TimeFormat,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            platform: Platform::WhatsApp,
            appearance: Appearance::Light,
            mobile: false,
            time_format: TimeFormat::TwentyFourHour,
        }
    }
}

/// In-memory state of one mock-up. Text and names are the inputs; messages and
/// groups are derived and recomputed whole on every relevant event.
pub struct Session<C: Clock = SystemClock> {
    clock: C,
    parse_mode: ParseMode,
    script: String,
    sender: Participant,
    receiver: Participant,
    display: DisplaySettings,
    messages: Vec<Message>,
    groups: Vec<MessageGroup>,
}

impl<C: Clock> Session<C> {
    pub fn new(
        clock: C,
        parse_mode: ParseMode,
        sender: Participant,
        receiver: Participant,
        display: DisplaySettings,
    ) -> Self {
        Self {
            clock,
            parse_mode,
            script: String::new(),
            sender,
            receiver,
            display,
            messages: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.dispatch(SessionEvent::ScriptChanged(script.into()));
        self
    }

    /// Applies `event`; returns true when messages were recomputed.
    pub fn dispatch(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::ScriptChanged(script) => {
                self.script = script;
                self.recompute();
                true
            }
            SessionEvent::SenderNameChanged(name) => {
                self.sender.name = name;
                self.recompute();
                true
            }
            SessionEvent::ReceiverNameChanged(name) => {
                self.receiver.name = name;
                self.recompute();
                true
            }
            SessionEvent::SenderPhotoChanged(photo) => {
                self.sender.photo = photo;
                false
            }
            SessionEvent::ReceiverPhotoChanged(photo) => {
                self.receiver.photo = photo;
                false
            }
            SessionEvent::PlatformChanged(platform) => {
                self.display.platform = platform;
                false
            }
            SessionEvent::AppearanceToggled => {
                self.display.appearance = self.display.appearance.toggled();
                false
            }
            SessionEvent::MobileModeToggled => {
                self.display.mobile = !self.display.mobile;
                false
            }
        }
    }

    fn recompute(&mut self) {
        let now = self.clock.now();
        self.messages = parse_conversation_with_mode(&self.script, now, self.parse_mode);
        self.groups = group_messages(&self.messages);
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn groups(&self) -> &[MessageGroup] {
        &self.groups
    }

    pub fn display(&self) -> DisplaySettings {
        self.display
    }

    pub fn participant(&self, role: Role) -> &Participant {
        match role {
            Role::Sender => &self.sender,
            Role::Receiver => &self.receiver,
        }
    }

    pub fn view(&self) -> ChatView {
        ChatView::build(&self.groups, &self.sender, &self.receiver, self.display)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::{DateTime, Duration, FixedOffset, TimeZone};

    use super::{Clock, DisplaySettings, FixedClock, Participant, Session, SessionEvent};
    use crate::platform::{Appearance, Platform};
    use crate::script::{ParseMode, Role};

    struct TickingClock {
        base: DateTime<FixedOffset>,
        ticks: Cell<i64>,
    }

    impl Clock for TickingClock {
        fn now(&self) -> DateTime<FixedOffset> {
            let tick = self.ticks.get();
            self.ticks.set(tick + 1);
            self.base + Duration::minutes(tick)
        }
    }

    fn base() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 9, 12, 0, 0)
            .unwrap()
    }

    fn session<C: Clock>(clock: C) -> Session<C> {
        Session::new(
            clock,
            ParseMode::Carry,
            Participant::named("Alice"),
            Participant::named("Bob"),
            DisplaySettings::default(),
        )
    }

    #[test]
    fn script_and_name_changes_recompute() {
        let clock = TickingClock {
            base: base(),
            ticks: Cell::new(0),
        };
        let mut session = session(clock).with_script("> hi\n< hey\n< there");
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.groups().len(), 2);
        let first_stamp = session.messages()[0].timestamp;

        assert!(session.dispatch(SessionEvent::ReceiverNameChanged("Carol".into())));
        assert_eq!(session.participant(Role::Receiver).name, "Carol");
        assert_ne!(session.messages()[0].timestamp, first_stamp);
    }

    #[test]
    fn display_events_do_not_reparse() {
        let mut session = session(FixedClock(base())).with_script("> a");
        assert!(!session.dispatch(SessionEvent::AppearanceToggled));
        assert!(!session.dispatch(SessionEvent::PlatformChanged(Platform::Instagram)));
        assert!(!session.dispatch(SessionEvent::MobileModeToggled));
        let display = session.display();
        assert_eq!(display.appearance, Appearance::Dark);
        assert_eq!(display.platform, Platform::Instagram);
        assert!(display.mobile);
    }

    #[test]
    fn reparse_replaces_previous_result() {
        let mut session = session(FixedClock(base())).with_script("> a\n> b");
        session.dispatch(SessionEvent::ScriptChanged("< only".into()));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::Receiver);
        assert_eq!(session.script(), "< only");
    }

    #[test]
    fn initial_handles_unicode_and_empty_names() {
        assert_eq!(Participant::named("ömer").initial(), "Ö");
        assert_eq!(Participant::named("  ").initial(), "?");
    }
}

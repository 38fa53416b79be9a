use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error_codes::{CodedError, UNKNOWN_PLATFORM, UNKNOWN_TIME_FORMAT};

pub type Rgba = [u8; 4];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    WhatsApp,
    Instagram,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::WhatsApp, Platform::Instagram];

    pub fn display_name(self) -> &'static str {
        match self {
            Platform::WhatsApp => "WhatsApp",
            Platform::Instagram => "Instagram",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Platform::WhatsApp => "whatsapp",
            Platform::Instagram => "instagram",
        }
    }

    pub fn status_text(self) -> &'static str {
        match self {
            Platform::WhatsApp => "online",
            Platform::Instagram => "Active now",
        }
    }

    pub fn palette(self, appearance: Appearance) -> Palette {
        match (self, appearance) {
            (Platform::WhatsApp, Appearance::Light) => Palette {
                primary: hex(0x075e54),
                secondary: hex(0x25d366),
                background: hex(0xe5ddd5),
                sender_bubble: hex(0xdcf8c6),
                receiver_bubble: hex(0xffffff),
                input_background: hex(0xf0f0f0),
                text: hex(0x303030),
                text_secondary: hex(0x667781),
                sender_text: hex(0x303030),
                header_text: hex(0xffffff),
            },
            (Platform::WhatsApp, Appearance::Dark) => Palette {
                primary: hex(0x2a2f32),
                secondary: hex(0x00a884),
                background: hex(0x0b141a),
                sender_bubble: hex(0x005c4b),
                receiver_bubble: hex(0x202c33),
                input_background: hex(0x2a2f32),
                text: hex(0xe9edef),
                text_secondary: hex(0x8696a0),
                sender_text: hex(0xe9edef),
                header_text: hex(0xe9edef),
            },
            (Platform::Instagram, Appearance::Light) => Palette {
                primary: hex(0xffffff),
                secondary: hex(0x405de6),
                background: hex(0xffffff),
                sender_bubble: hex(0x405de6),
                receiver_bubble: hex(0xefefef),
                input_background: hex(0xfafafa),
                text: hex(0x262626),
                text_secondary: hex(0x8e8e8e),
                sender_text: hex(0xffffff),
                header_text: hex(0x262626),
            },
            (Platform::Instagram, Appearance::Dark) => Palette {
                primary: hex(0x262626),
                secondary: hex(0x405de6),
                background: hex(0x000000),
                sender_bubble: hex(0x405de6),
                receiver_bubble: hex(0x262626),
                input_background: hex(0x121212),
                text: hex(0xffffff),
                text_secondary: hex(0x8e8e8e),
                sender_text: hex(0xffffff),
                header_text: hex(0xffffff),
            },
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Platform {
    type Err = CodedError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "whatsapp" | "wa" | "whats-app" => Ok(Platform::WhatsApp),
            "instagram" | "ig" | "insta" => Ok(Platform::Instagram),
            _ => {
                let supported = Platform::ALL.map(Platform::slug);
                Err(CodedError::usage(
                    UNKNOWN_PLATFORM,
                    format!(
                        "unknown platform '{raw}'. Supported: {}",
                        supported.join(", ")
                    ),
                )
                .with_details(serde_json::json!({ "supported": supported })))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    #[default]
    Light,
    Dark,
}

impl Appearance {
    pub fn from_dark_mode(dark: bool) -> Self {
        if dark {
            Appearance::Dark
        } else {
            Appearance::Light
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Appearance::Light => Appearance::Dark,
            Appearance::Dark => Appearance::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: Rgba,
    pub secondary: Rgba,
    pub background: Rgba,
    pub sender_bubble: Rgba,
    pub receiver_bubble: Rgba,
    pub input_background: Rgba,
    pub text: Rgba,
    pub text_secondary: Rgba,
    /// Text drawn on top of the sender bubble.
    pub sender_text: Rgba,
    /// Title and status drawn on top of the header bar.
    pub header_text: Rgba,
}

const fn hex(value: u32) -> Rgba {
    [
        ((value >> 16) & 0xff) as u8,
        ((value >> 8) & 0xff) as u8,
        (value & 0xff) as u8,
        255,
    ]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
    #[serde(rename = "12h")]
    TwelveHour,
}

impl TimeFormat {
    pub fn format(self, timestamp: &DateTime<FixedOffset>) -> String {
        match self {
            TimeFormat::TwentyFourHour => timestamp.format("%H:%M").to_string(),
            TimeFormat::TwelveHour => timestamp.format("%I:%M %p").to_string(),
        }
    }
}

impl FromStr for TimeFormat {
    type Err = CodedError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "24h" | "24" | "24-hour" => Ok(TimeFormat::TwentyFourHour),
            "12h" | "12" | "12-hour" => Ok(TimeFormat::TwelveHour),
            _ => Err(CodedError::usage(
                UNKNOWN_TIME_FORMAT,
                format!("unknown time format '{raw}'. Supported: 24h, 12h"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::{Appearance, Platform, TimeFormat};
    use crate::error_codes::UNKNOWN_PLATFORM;

    #[test]
    fn palettes_match_platform_colors() {
        let light = Platform::WhatsApp.palette(Appearance::Light);
        assert_eq!(light.sender_bubble, [0xdc, 0xf8, 0xc6, 255]);
        let dark = Platform::Instagram.palette(Appearance::Dark);
        assert_eq!(dark.background, [0, 0, 0, 255]);
        assert_eq!(dark.sender_bubble, [0x40, 0x5d, 0xe6, 255]);
    }

    #[test]
    fn platform_parsing_accepts_aliases_and_reports_code() {
        assert_eq!("IG".parse::<Platform>().unwrap(), Platform::Instagram);
        assert_eq!(" whatsapp ".parse::<Platform>().unwrap(), Platform::WhatsApp);
        let error = "signal".parse::<Platform>().unwrap_err();
        assert_eq!(error.code, UNKNOWN_PLATFORM);
        assert!(error.message.contains("signal"));
        assert!(error.message.ends_with("Supported: whatsapp, instagram"));
        assert_eq!(
            error.details.expect("details")["supported"],
            serde_json::json!(["whatsapp", "instagram"])
        );
    }

    #[test]
    fn time_formats_render_locale_styles() {
        let ts = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 22, 5, 0)
            .unwrap();
        assert_eq!(TimeFormat::TwentyFourHour.format(&ts), "22:05");
        assert_eq!(TimeFormat::TwelveHour.format(&ts), "10:05 PM");
    }

    #[test]
    fn status_text_differs_per_platform() {
        assert_eq!(Platform::WhatsApp.status_text(), "online");
        assert_eq!(Platform::Instagram.status_text(), "Active now");
        assert_eq!(Appearance::Light.toggled(), Appearance::Dark);
    }
}

//! Events that can occur in an intake session

use chrono::NaiveDateTime;
use std::fmt;

/// Slash commands understood by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    IndicateUsage,
    IndicateFuel,
    ViewRecords,
    Cancel,
    /// Any other `/word`
    Unknown(String),
}

impl Command {
    /// Parse a message as a command. Returns `None` for plain text.
    ///
    /// A trailing `@botname` and any arguments after the command are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix('/')?;
        let word = rest.split_whitespace().next().unwrap_or_default();
        let name = word.split('@').next().unwrap_or_default();

        Some(match name {
            "start" | "help" => Command::Start,
            "indicate_usage" => Command::IndicateUsage,
            "indicate_fuel" => Command::IndicateFuel,
            "view_records" => Command::ViewRecords,
            "cancel" => Command::Cancel,
            other => Command::Unknown(other.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Command::Start => "start",
            Command::IndicateUsage => "indicate_usage",
            Command::IndicateFuel => "indicate_fuel",
            Command::ViewRecords => "view_records",
            Command::Cancel => "cancel",
            Command::Unknown(name) => name,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.as_str())
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User events
    Command(Command),
    UserText {
        text: String,
        /// Arrival time, used to resolve "Now"
        received_at: NaiveDateTime,
    },

    // Ledger events
    /// Highest odometer reading recorded before the trip date, if any
    PreviousOdometer { reading: Option<i64> },

    // Runtime events
    /// No message arrived within the session idle timeout
    IdleTimeout,
}

impl Event {
    /// Classify an inbound message as a command or a free-text reply
    pub fn from_message(text: &str, received_at: NaiveDateTime) -> Self {
        match Command::parse(text) {
            Some(command) => Event::Command(command),
            None => Event::UserText {
                text: text.to_string(),
                received_at,
            },
        }
    }
}

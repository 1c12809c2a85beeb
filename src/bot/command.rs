//! Chat command parser.

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Subscribe and show today's freebies.
    Start,
    /// Freebies from the last day.
    Today,
    /// Freebies from the last two days.
    Yesterday,
    /// Freebies from the last eight days.
    Week,
    /// Freebies from the last 31 days.
    Month,
    /// Toggle the subscription.
    Receive,
    /// Anything else starting with `/`.
    Unknown(String),
}

impl Command {
    /// Parse a message text.
    ///
    /// Returns `None` for text that is not a command. A `@botname` suffix on
    /// the command word is ignored, as are any arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim_start().split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or_default();
        if name.is_empty() {
            return None;
        }

        let command = match name {
            "start" => Command::Start,
            "today" => Command::Today,
            "yesterday" => Command::Yesterday,
            "week" => Command::Week,
            "month" => Command::Month,
            "receive" => Command::Receive,
            other => Command::Unknown(other.to_string()),
        };
        Some(command)
    }

    /// How many days back a catch-up command looks.
    pub fn catch_up_days(&self) -> Option<i64> {
        match self {
            Command::Today => Some(1),
            Command::Yesterday => Some(2),
            Command::Week => Some(8),
            Command::Month => Some(31),
            _ => None,
        }
    }

    /// Get the command name.
    pub fn name(&self) -> &str {
        match self {
            Command::Start => "start",
            Command::Today => "today",
            Command::Yesterday => "yesterday",
            Command::Week => "week",
            Command::Month => "month",
            Command::Receive => "receive",
            Command::Unknown(name) => name,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.name())
    }
}

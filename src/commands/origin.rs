use std::fmt;

/// Where a command invocation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Local operator console (stdin)
    Console,
    /// Direct/private message to the bot
    Private,
    /// Message posted in a guild channel
    Guild,
}

impl Origin {
    /// The single-origin mask bit matching this origin.
    pub fn mask(self) -> OriginMask {
        match self {
            Self::Console => OriginMask::CONSOLE,
            Self::Private => OriginMask::PRIVATE,
            Self::Guild => OriginMask::GUILD,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Private => "private",
            Self::Guild => "guild",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "private" | "dm" => Ok(Self::Private),
            "guild" | "server" => Ok(Self::Guild),
            other => Err(format!("unknown origin '{other}' (console, private, guild)")),
        }
    }
}

/// Bitset describing which origins may invoke a command, plus the
/// owner-only marker.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OriginMask(u8);

impl OriginMask {
    pub const NONE: Self = Self(0);
    pub const CONSOLE: Self = Self(1 << 0);
    pub const PRIVATE: Self = Self(1 << 1);
    pub const GUILD: Self = Self(1 << 2);
    pub const OWNER_ONLY: Self = Self(1 << 4);
    pub const ALL: Self = Self(Self::CONSOLE.0 | Self::PRIVATE.0 | Self::GUILD.0);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && (self.0 & other.0) == other.0
    }

    pub fn is_owner_only(self) -> bool {
        self.contains(Self::OWNER_ONLY)
    }

    /// Whether `origin` is allowed by this mask.
    pub fn allows(self, origin: Origin) -> bool {
        self.contains(origin.mask())
    }

    /// True when at least one origin can reach the command.
    pub fn is_accessible(self) -> bool {
        (self.0 & Self::ALL.0) != 0
    }

    /// Parse a slash-separated origin list such as `"private/server"` or
    /// `"all/ownerOnly"`. Tokens are case-insensitive; unknown tokens are
    /// skipped with a warning.
    pub fn parse(origins: &str) -> Self {
        let mut mask = Self::NONE;
        for token in origins.split('/').map(str::trim).filter(|t| !t.is_empty()) {
            match token.to_ascii_lowercase().as_str() {
                "console" => mask = mask.union(Self::CONSOLE),
                "private" => mask = mask.union(Self::PRIVATE),
                "server" | "guild" => mask = mask.union(Self::GUILD),
                "all" => mask = mask.union(Self::ALL),
                "owneronly" => mask = mask.union(Self::OWNER_ONLY),
                other => {
                    tracing::warn!(token = other, "ignoring unknown origin token");
                }
            }
        }
        mask
    }
}

impl Default for OriginMask {
    fn default() -> Self {
        Self::PRIVATE.union(Self::GUILD)
    }
}

impl std::ops::BitOr for OriginMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for OriginMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OriginMask({self})")
    }
}

impl fmt::Display for OriginMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for (bit, name) in [
            (Self::CONSOLE, "console"),
            (Self::PRIVATE, "private"),
            (Self::GUILD, "server"),
            (Self::OWNER_ONLY, "ownerOnly"),
        ] {
            if self.contains(bit) {
                parts.push(name);
            }
        }
        if parts.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&parts.join("/"))
        }
    }
}

//! Events emitted by the IRC client for the bot layer to consume.

/// Events that the client emits to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Successfully connected to the server.
    Connected,

    /// IRC registration complete. `nick` is our confirmed nick.
    Registered {
        nick: String,
    },

    /// Someone (possibly us) joined a channel.
    Joined {
        channel: String,
        nick: String,
    },

    /// Someone left a channel.
    Parted {
        channel: String,
        nick: String,
    },

    /// Someone was kicked from a channel.
    Kicked {
        channel: String,
        nick: String,
        by: String,
        reason: String,
    },

    /// We were invited to a channel.
    Invited {
        channel: String,
        by: String,
    },

    /// A user changed nick.
    NickChanged {
        old_nick: String,
        new_nick: String,
    },

    /// A message in a channel or private message.
    Message {
        from: String,
        target: String,
        text: String,
    },

    /// A CTCP ACTION (`/me`) in a channel or private message.
    Action {
        from: String,
        target: String,
        text: String,
    },

    /// Server sent an error or notice.
    ServerNotice {
        text: String,
    },

    /// Someone quit the server.
    UserQuit {
        nick: String,
        reason: String,
    },

    /// Connection was closed.
    Disconnected {
        reason: String,
    },

    /// Raw server line (for debugging).
    RawLine(String),
}

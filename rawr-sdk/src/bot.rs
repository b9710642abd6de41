//! Bot host: owns the plugins and routes chat lines to them.

use anyhow::Result;
use parking_lot::RwLock;

use crate::client::ClientHandle;
use crate::event::Event;
use crate::irc;
use crate::output;
use crate::plugin::{Incoming, Plugin, Response};

/// Plugin dispatcher bound to one connection's identity.
pub struct Bot {
    nick: RwLock<String>,
    prefix: String,
    plugins: Vec<Box<dyn Plugin>>,
}

impl Bot {
    pub fn new(nick: &str, prefix: &str) -> Self {
        Self {
            nick: RwLock::new(nick.to_string()),
            prefix: prefix.to_string(),
            plugins: Vec::new(),
        }
    }

    /// Register a plugin. Plugins run in registration order.
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// The nick the server confirmed for us.
    pub fn nick(&self) -> String {
        self.nick.read().clone()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Names of registered plugins, in order.
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Build the plugin view of a line.
    pub fn incoming(&self, from: &str, target: &str, text: &str) -> Incoming {
        Incoming {
            text: text.to_string(),
            sender: from.to_string(),
            channel: irc::is_channel(target).then(|| target.to_string()),
            bot_nick: self.nick(),
            prefix: self.prefix.clone(),
        }
    }

    /// Run every plugin against `msg` and collect their replies.
    ///
    /// A failing plugin is logged and skipped; the rest still run.
    pub fn dispatch(&self, msg: &Incoming) -> Vec<Response> {
        if let Some(replies) = self.help(msg) {
            return replies;
        }

        let mut replies = Vec::new();
        for plugin in &self.plugins {
            match plugin.handle(msg) {
                Ok(mut out) => replies.append(&mut out),
                Err(e) => {
                    tracing::error!(plugin = plugin.name(), error = %e, "Plugin failed");
                }
            }
        }
        replies
    }

    /// `help` lists plugins; `help <name>` shows that plugin's usage.
    fn help(&self, msg: &Incoming) -> Option<Vec<Response>> {
        let cmd = msg.command_text()?;
        let mut words = cmd.split_whitespace();
        if !words.next()?.eq_ignore_ascii_case("help") {
            return None;
        }
        match words.next() {
            None => Some(vec![Response::say(format!(
                "Plugins: {}. See: {}help <plugin>",
                self.plugin_names().join(", "),
                self.prefix
            ))]),
            Some(name) => {
                let plugin = self
                    .plugins
                    .iter()
                    .find(|p| p.name().eq_ignore_ascii_case(name))?;
                let lines = plugin.help();
                if lines.is_empty() {
                    return Some(vec![Response::say(format!("No help for {}.", plugin.name()))]);
                }
                Some(lines.iter().map(|l| Response::say(*l)).collect())
            }
        }
    }

    /// Handle one client event: track our nick and answer messages and emotes.
    pub async fn handle_event(&self, handle: &ClientHandle, event: &Event) -> Result<()> {
        match event {
            Event::Registered { nick } => {
                tracing::info!(nick = %nick, "Registered");
                *self.nick.write() = nick.clone();
            }
            Event::NickChanged { old_nick, new_nick } => {
                let mut current = self.nick.write();
                if current.eq_ignore_ascii_case(old_nick) {
                    tracing::info!(nick = %new_nick, "Nick changed");
                    *current = new_nick.clone();
                }
            }
            Event::Joined { channel, nick } if nick.eq_ignore_ascii_case(&self.nick()) => {
                tracing::info!(channel = %channel, "Joined");
            }
            Event::Kicked { channel, nick, by, reason } if nick.eq_ignore_ascii_case(&self.nick()) => {
                tracing::warn!(channel = %channel, by = %by, reason = %reason, "Kicked");
            }
            // Emotes go through the same plugins as plain lines.
            Event::Message { from, target, text } | Event::Action { from, target, text } => {
                if from.eq_ignore_ascii_case(&self.nick()) {
                    return Ok(());
                }
                let msg = self.incoming(from, target, text);
                let replies = self.dispatch(&msg);
                self.send(handle, msg.reply_target(), &replies).await?;
            }
            Event::ServerNotice { text } => tracing::debug!(text = %text, "Server notice"),
            Event::Disconnected { reason } => tracing::warn!(reason = %reason, "Disconnected"),
            _ => {}
        }
        Ok(())
    }

    /// Send replies to `target`, one wire line per text line, each within
    /// the line budget.
    pub async fn send(&self, handle: &ClientHandle, target: &str, replies: &[Response]) -> Result<()> {
        let nick = self.nick();
        for reply in replies {
            let budget = output::line_budget(&nick, target, reply.action);
            for line in output::fit_lines(&reply.text, budget) {
                if reply.action {
                    handle.action(target, &line).await?;
                } else {
                    handle.privmsg(target, &line).await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Command;
    use tokio::sync::mpsc;

    struct Echo;

    impl Plugin for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn help(&self) -> &[&str] {
            &["Echo module", "Usage: testbot: <anything>"]
        }

        fn handle(&self, msg: &Incoming) -> Result<Vec<Response>> {
            Ok(msg
                .addressed_text()
                .filter(|t| !t.is_empty())
                .map(|t| vec![Response::say(t)])
                .unwrap_or_default())
        }
    }

    struct Broken;

    impl Plugin for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn handle(&self, _msg: &Incoming) -> Result<Vec<Response>> {
            anyhow::bail!("disk on fire")
        }
    }

    fn bot() -> Bot {
        Bot::new("testbot", "!").with_plugin(Broken).with_plugin(Echo)
    }

    #[test]
    fn failing_plugin_does_not_block_others() {
        let bot = bot();
        let msg = bot.incoming("test", "#c", "testbot: hello");
        assert_eq!(bot.dispatch(&msg), vec![Response::say("hello")]);
    }

    #[test]
    fn help_lists_plugins_and_shows_usage() {
        let bot = bot();
        let replies = bot.dispatch(&bot.incoming("test", "#c", "!help"));
        assert_eq!(
            replies,
            vec![Response::say("Plugins: broken, echo. See: !help <plugin>")]
        );

        let replies = bot.dispatch(&bot.incoming("test", "#c", "!help echo"));
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].text, "Echo module");

        let replies = bot.dispatch(&bot.incoming("test", "#c", "!help broken"));
        assert_eq!(replies, vec![Response::say("No help for broken.")]);
    }

    #[tokio::test]
    async fn answers_in_channel_and_ignores_self() {
        let bot = bot();
        let (tx, mut rx) = mpsc::channel(16);
        let handle = ClientHandle::from_sender(tx);

        let event = Event::Message {
            from: "alice".into(),
            target: "#rawr".into(),
            text: "testbot: hi".into(),
        };
        bot.handle_event(&handle, &event).await.unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            Command::Privmsg {
                target: "#rawr".into(),
                text: "hi".into()
            }
        );

        let own = Event::Message {
            from: "testbot".into(),
            target: "#rawr".into(),
            text: "testbot: loop".into(),
        };
        bot.handle_event(&handle, &own).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn emotes_reach_plugins() {
        let bot = bot();
        let (tx, mut rx) = mpsc::channel(16);
        let handle = ClientHandle::from_sender(tx);

        let event = Event::Action {
            from: "alice".into(),
            target: "#rawr".into(),
            text: "testbot: pets".into(),
        };
        bot.handle_event(&handle, &event).await.unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            Command::Privmsg {
                target: "#rawr".into(),
                text: "pets".into()
            }
        );

        let own = Event::Action {
            from: "testbot".into(),
            target: "#rawr".into(),
            text: "testbot: loop".into(),
        };
        bot.handle_event(&handle, &own).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn private_messages_answer_the_sender() {
        let bot = bot();
        let (tx, mut rx) = mpsc::channel(16);
        let handle = ClientHandle::from_sender(tx);

        let event = Event::Message {
            from: "alice".into(),
            target: "testbot".into(),
            text: "psst".into(),
        };
        bot.handle_event(&handle, &event).await.unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            Command::Privmsg {
                target: "alice".into(),
                text: "psst".into()
            }
        );
    }

    #[tokio::test]
    async fn tracks_nick_from_registration() {
        let bot = bot();
        let (tx, mut rx) = mpsc::channel(16);
        let handle = ClientHandle::from_sender(tx);

        bot.handle_event(&handle, &Event::Registered { nick: "testbot1".into() })
            .await
            .unwrap();
        assert_eq!(bot.nick(), "testbot1");

        let event = Event::Message {
            from: "alice".into(),
            target: "#rawr".into(),
            text: "testbot1: still here".into(),
        };
        bot.handle_event(&handle, &event).await.unwrap();
        assert!(matches!(rx.try_recv().unwrap(), Command::Privmsg { .. }));
    }

    #[tokio::test]
    async fn long_replies_are_truncated_and_actions_wrapped() {
        let bot = Bot::new("testbot", "!");
        let (tx, mut rx) = mpsc::channel(16);
        let handle = ClientHandle::from_sender(tx);

        let long = "word ".repeat(200);
        bot.send(&handle, "#rawr", &[Response::say(long), Response::action("waves")])
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            Command::Privmsg { text, .. } => {
                assert!(text.ends_with("..."));
                assert!(text.len() <= output::line_budget("testbot", "#rawr", false));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            rx.try_recv().unwrap(),
            Command::Privmsg {
                target: "#rawr".into(),
                text: "\x01ACTION waves\x01".into()
            }
        );
    }
}

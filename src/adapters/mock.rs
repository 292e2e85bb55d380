//! Scripted transport for tests.
//!
//! Plays back canned outcomes keyed by command. Each command keeps a queue
//! of outcomes; the queue pops until one entry remains, which then repeats
//! forever. That makes both "garbage once, then good readings" and steady
//! multi-tick scripts easy to express without hardware.

use super::{AdapterError, Transport};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// One scripted outcome for a query.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Answer with this line.
    Line(String),
    /// Simulate a reply timeout.
    Timeout,
}

/// A [`Transport`] that answers from a script instead of a bus.
#[derive(Default)]
pub struct MockTransport {
    replies: HashMap<String, VecDeque<MockReply>>,
    refuse_connect: bool,
    connected: bool,
    /// Every command issued, in order.
    pub sent: Vec<String>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose `connect` fails, for exercising open-time errors.
    pub fn refusing_connection() -> Self {
        Self {
            refuse_connect: true,
            ..Self::default()
        }
    }

    /// Queue a reply line for `command`.
    pub fn with_reply(mut self, command: &str, reply: &str) -> Self {
        self.replies
            .entry(command.to_string())
            .or_default()
            .push_back(MockReply::Line(reply.to_string()));
        self
    }

    /// Queue a timeout for `command`.
    pub fn with_timeout(mut self, command: &str) -> Self {
        self.replies
            .entry(command.to_string())
            .or_default()
            .push_back(MockReply::Timeout);
        self
    }

    fn next_reply(&mut self, command: &str) -> Option<MockReply> {
        let queue = self.replies.get_mut(command)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<(), AdapterError> {
        if self.refuse_connect {
            return Err(AdapterError::ConnectionFailed("scripted refusal".to_string()));
        }
        self.connected = true;
        Ok(())
    }

    async fn query(&mut self, command: &str) -> Result<String, AdapterError> {
        if !self.connected {
            return Err(AdapterError::NotConnected);
        }
        self.sent.push(command.to_string());
        match self.next_reply(command) {
            Some(MockReply::Line(line)) => Ok(line),
            Some(MockReply::Timeout) | None => Err(AdapterError::Timeout(Duration::ZERO)),
        }
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_reply_repeats() {
        let mut mock = MockTransport::new()
            .with_reply("TEMP?", "NO_PROBE")
            .with_reply("TEMP?", "+77.00");
        mock.connect().await.unwrap();

        assert_eq!(mock.query("TEMP?").await.unwrap(), "NO_PROBE");
        assert_eq!(mock.query("TEMP?").await.unwrap(), "+77.00");
        assert_eq!(mock.query("TEMP?").await.unwrap(), "+77.00");
    }

    #[tokio::test]
    async fn test_unscripted_command_times_out() {
        let mut mock = MockTransport::new();
        mock.connect().await.unwrap();
        assert!(matches!(
            mock.query("SETP?").await,
            Err(AdapterError::Timeout(_))
        ));
    }
}

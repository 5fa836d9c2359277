use crate::stopwatch::Stopwatch;

/// Control token a remote subscriber can send to drive a stopwatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    Reset,
}

impl ControlCommand {
    /// Parses an inbound text token. Unknown tokens yield `None` and are
    /// expected to be ignored by the transport adapter.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }

    pub async fn apply(self, stopwatch: &Stopwatch) {
        match self {
            Self::Start => stopwatch.start().await,
            Self::Stop => stopwatch.stop().await,
            Self::Reset => stopwatch.reset().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tokens_parse() {
        assert_eq!(ControlCommand::parse("start"), Some(ControlCommand::Start));
        assert_eq!(ControlCommand::parse("stop"), Some(ControlCommand::Stop));
        assert_eq!(ControlCommand::parse("reset"), Some(ControlCommand::Reset));
        assert_eq!(ControlCommand::parse(" start\n"), Some(ControlCommand::Start));
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert_eq!(ControlCommand::parse("pause"), None);
        assert_eq!(ControlCommand::parse(""), None);
    }

    #[tokio::test]
    async fn commands_drive_the_stopwatch() {
        let stopwatch = Stopwatch::builder().build().unwrap();

        ControlCommand::Start.apply(&stopwatch).await;
        assert!(stopwatch.is_running());

        ControlCommand::Stop.apply(&stopwatch).await;
        assert!(!stopwatch.is_running());

        ControlCommand::Reset.apply(&stopwatch).await;
        assert_eq!(stopwatch.stop_time(), std::time::Duration::ZERO);
    }
}

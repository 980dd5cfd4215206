use std::sync::Mutex;

use once_cell::sync::Lazy;

use courtside::notifications::{NotificationLevel, Notifier};
use courtside::telemetry::{get_subscriber, init_subscriber};

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Keeps every notification so tests can assert on what the operator saw
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(NotificationLevel, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_level(&self, level: NotificationLevel) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.with_level(NotificationLevel::Error)
    }

    pub fn successes(&self) -> Vec<String> {
        self.with_level(NotificationLevel::Success)
    }
}

impl Notifier for RecordingNotifier {
    fn emit(&self, level: NotificationLevel, message: &str) {
        self.messages.lock().unwrap().push((level, message.to_string()));
    }
}

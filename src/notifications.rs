use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

impl Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationLevel::Success => f.write_str("success"),
            NotificationLevel::Error => f.write_str("error"),
        }
    }
}

/// Transient user-facing messages (toasts in a UI, lines in the console)
pub trait Notifier: Send + Sync {
    fn emit(&self, level: NotificationLevel, message: &str);

    fn success(&self, message: &str) {
        self.emit(NotificationLevel::Success, message);
    }

    fn error(&self, message: &str) {
        self.emit(NotificationLevel::Error, message);
    }
}

/// Routes notifications into the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn emit(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Success => tracing::info!(notification = %level, "{}", message),
            NotificationLevel::Error => tracing::error!(notification = %level, "{}", message),
        }
    }
}

/// Prints notifications for the operator and logs them
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn emit(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Success => println!("✅ {}", message),
            NotificationLevel::Error => println!("❌ {}", message),
        }
        TracingNotifier.emit(level, message);
    }
}

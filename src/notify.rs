use log::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Info,
    Success,
    Warning,
    Error,
}

/// User feedback sink. The board works without one; front ends plug in
/// toasts, a status bar or the log.
pub trait Notifier {
    fn notify(&mut self, notice: Notice, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&mut self, _notice: Notice, _message: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, notice: Notice, message: &str) {
        match notice {
            Notice::Info | Notice::Success => info!("{}", message),
            Notice::Warning => warn!("{}", message),
            Notice::Error => error!("{}", message),
        }
    }
}

/// Keeps every notice, for tests and replay reports.
#[derive(Debug, Default, Clone)]
pub struct CollectingNotifier {
    pub notices: Vec<(Notice, String)>,
}

impl Notifier for CollectingNotifier {
    fn notify(&mut self, notice: Notice, message: &str) {
        self.notices.push((notice, message.to_string()));
    }
}

impl CollectingNotifier {
    pub fn last(&self) -> Option<&(Notice, String)> {
        self.notices.last()
    }
}

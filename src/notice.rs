//! Non-fatal messages shown alongside a proclamation.

/// How loudly a [`Notice`] is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Something worked
    Success,
    /// Nothing went wrong, but there's something to say
    Info,
    /// A step fell back to a substitute value
    Warning,
    /// An optional step failed outright
    Error,
}

impl NoticeLevel {
    /// CSS class used by the templates
    pub fn class(self) -> &'static str {
        match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// A message for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    /// severity
    pub level: NoticeLevel,
    /// what to show
    pub text: String,
}

impl Notice {
    /// A success message
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    /// An informational message
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    /// A fallback warning
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    /// An error from an optional step
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }

    /// CSS class used by the templates
    pub fn class(&self) -> &'static str {
        self.level.class()
    }
}

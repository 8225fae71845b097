use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Ok,
    NotFound,
    Corruption,
    InvalidArgument,
    IOError,
    Busy,
    Aborted,
    /// Operation on an iterator that has already been ended.
    AlreadyEnded,
}

#[derive(Debug, Clone)]
pub struct Status {
    code: Code,
    message: Option<String>,
}

impl Status {
    pub fn ok() -> Self {
        Status {
            code: Code::Ok,
            message: None,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Status {
            code: Code::NotFound,
            message: Some(msg.into()),
        }
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        Status {
            code: Code::Corruption,
            message: Some(msg.into()),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Status {
            code: Code::InvalidArgument,
            message: Some(msg.into()),
        }
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Status {
            code: Code::IOError,
            message: Some(msg.into()),
        }
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Status {
            code: Code::Busy,
            message: Some(msg.into()),
        }
    }

    pub fn aborted(msg: impl Into<String>) -> Self {
        Status {
            code: Code::Aborted,
            message: Some(msg.into()),
        }
    }

    pub fn already_ended() -> Self {
        Status {
            code: Code::AlreadyEnded,
            message: Some("iterator has ended".to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }

    pub fn is_not_found(&self) -> bool {
        self.code == Code::NotFound
    }

    pub fn is_corruption(&self) -> bool {
        self.code == Code::Corruption
    }

    pub fn is_io_error(&self) -> bool {
        self.code == Code::IOError
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.code == Code::InvalidArgument
    }

    pub fn is_busy(&self) -> bool {
        self.code == Code::Busy
    }

    pub fn is_already_ended(&self) -> bool {
        self.code == Code::AlreadyEnded
    }

    pub fn code(&self) -> &Code {
        &self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{:?}: {}", self.code, msg),
            None => write!(f, "{:?}", self.code),
        }
    }
}

impl std::error::Error for Status {}

impl From<serde_json::Error> for Status {
    fn from(err: serde_json::Error) -> Self {
        Status::invalid_argument(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for Status {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Status::io_error(format!("failed to build worker pool: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Status>;

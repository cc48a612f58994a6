pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no such user")]
    UserNotFound,
    #[error("no such item")]
    ItemNotFound,
    #[error("no such booking")]
    BookingNotFound,
    #[error("no such item request")]
    RequestNotFound,
    #[error("end must be after start")]
    EndNotAfterStart,
    #[error("item {0} is not available for booking")]
    ItemUnavailable(u64),
    #[error("owner cannot book own item")]
    OwnItemBooking,
    #[error("only owner may confirm")]
    DecideNotByOwner,
    #[error("only the owner may edit an item")]
    EditNotByOwner,
    #[error("booking already decided")]
    AlreadyDecided,
    #[error("from/size must be non-negative/positive")]
    InvalidPage,
    #[error("Unknown state: {0}")]
    UnknownState(String),
    #[error("no finished booking of item {0} by this user")]
    CommentWithoutBooking(u64),
    #[error("user with email {0} already exists")]
    EmailTaken(String),
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("corrupt stored record: {0}")]
    Codec(String),
}

/// Coarse classification of an [`Error`], for callers that map failures onto
/// transport codes. The core itself only ever returns the typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Forbidden,
    Conflict,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UserNotFound
            | Error::ItemNotFound
            | Error::BookingNotFound
            | Error::RequestNotFound => ErrorKind::NotFound,
            Error::EndNotAfterStart
            | Error::ItemUnavailable(_)
            | Error::AlreadyDecided
            | Error::InvalidPage
            | Error::UnknownState(_)
            | Error::CommentWithoutBooking(_) => ErrorKind::Validation,
            Error::OwnItemBooking | Error::DecideNotByOwner | Error::EditNotByOwner => {
                ErrorKind::Forbidden
            }
            Error::EmailTaken(_) => ErrorKind::Conflict,
            Error::Storage(_) | Error::Codec(_) => ErrorKind::Internal,
        }
    }
}

impl From<minicbor::decode::Error> for Error {
    fn from(err: minicbor::decode::Error) -> Self {
        Error::Codec(err.to_string())
    }
}

impl From<minicbor::encode::Error<std::convert::Infallible>> for Error {
    fn from(err: minicbor::encode::Error<std::convert::Infallible>) -> Self {
        Error::Codec(err.to_string())
    }
}

use crate::boxes::FourCC;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer bytes than a box header needs were left in the region.
    #[error("truncated header: need {needed} bytes, have {available}")]
    TruncatedHeader { needed: u64, available: u64 },

    /// A box declares more payload than its enclosing region holds.
    #[error("truncated body: {typ} declares {declared} bytes, only {available} available")]
    TruncatedBody {
        typ: FourCC,
        declared: u64,
        available: u64,
    },

    #[error("bad format: {0}")]
    BadFormat(String),

    #[error("missing mandatory box: {0}")]
    MissingBox(&'static str),

    /// An mdat decoded with `MdatPolicy::Defer` was encoded without its source.
    #[error("mdat payload was deferred; encode it with Mp4File::encode_from")]
    DeferredPayload,

    #[error("{typ} box at offset {offset}: {source}")]
    Box {
        typ: FourCC,
        offset: u64,
        #[source]
        source: std::boxed::Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn bad_format(msg: impl Into<String>) -> Self {
        Error::BadFormat(msg.into())
    }

    /// Attach the box that was being decoded when this error occurred.
    pub fn in_box(self, typ: FourCC, offset: u64) -> Self {
        Error::Box {
            typ,
            offset,
            source: std::boxed::Box::new(self),
        }
    }

    /// The innermost error, with all box context stripped.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Box { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

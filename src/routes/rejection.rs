use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

/// The message shown in place of errors whose details must stay in the
/// logs.
pub(crate) const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            error: public_message(&self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) error: String,
}

impl FlattenedRejection {
    pub fn without_context(error: &BackendError) -> Self {
        FlattenedRejection {
            context: Context::None,
            error: public_message(error),
        }
    }

    /// A body for rejections raised by warp itself rather than by a
    /// handler.
    pub fn with_message(message: &str) -> Self {
        FlattenedRejection {
            context: Context::None,
            error: message.to_owned(),
        }
    }
}

fn public_message(error: &BackendError) -> String {
    if error.is_client_error() {
        error.to_string()
    } else {
        INTERNAL_ERROR_MESSAGE.to_owned()
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    None,
    Create,
    Delete { id: String },
    List,
    ListByType { tipo: String },
    Retrieve { id: String },
    Stats,
    Test,
    Update { id: String },
}

impl Context {
    pub fn create() -> Context {
        Context::Create
    }

    pub fn delete(id: String) -> Context {
        Context::Delete { id }
    }

    pub fn list() -> Context {
        Context::List
    }

    pub fn list_by_type(tipo: String) -> Context {
        Context::ListByType { tipo }
    }

    pub fn retrieve(id: String) -> Context {
        Context::Retrieve { id }
    }

    pub fn stats() -> Context {
        Context::Stats
    }

    pub fn test() -> Context {
        Context::Test
    }

    pub fn update(id: String) -> Context {
        Context::Update { id }
    }
}

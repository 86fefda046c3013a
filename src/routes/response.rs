use serde::Serialize;

use crate::animal::Id;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse {
    Created {
        message: &'static str,
        id: Id,
    },
    Liveness {
        message: &'static str,
        /// Seconds since the Unix epoch, according to the store.
        timestamp: i64,
    },
    Message {
        message: &'static str,
    },
}

impl SuccessResponse {
    pub fn created(id: Id) -> Self {
        SuccessResponse::Created {
            message: "animal created",
            id,
        }
    }

    pub fn liveness(timestamp: i64) -> Self {
        SuccessResponse::Liveness {
            message: "store connection is working",
            timestamp,
        }
    }

    pub fn updated() -> Self {
        SuccessResponse::Message {
            message: "animal updated",
        }
    }

    pub fn deleted() -> Self {
        SuccessResponse::Message {
            message: "animal deleted",
        }
    }
}

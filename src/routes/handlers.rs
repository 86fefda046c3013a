use std::time::{Duration, Instant};

use log::debug;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::animal::{AnimalSubmission, Id};
use crate::dashboard::Dashboard;
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::routes::{
    rejection::{Context, Rejection},
    response::SuccessResponse,
};

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn list(environment: Environment) -> RouteResult {
    timed! {
        let animals = environment
            .repository
            .list()
            .await
            .map_err(|e: BackendError| Rejection::new(Context::list(), e))?;

        json(&animals)
    }
}

pub async fn list_by_type(environment: Environment, tipo: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::list_by_type(tipo.clone()), e);

        // path segments arrive percent-encoded
        let tipo = urlencoding::decode(&tipo)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| tipo.clone());
        debug!(environment.logger, "Filtering animals..."; "tipo" => &tipo);

        let animals = environment
            .repository
            .list_by_type(&tipo)
            .await
            .map_err(error_handler)?;

        json(&animals)
    }
}

pub async fn retrieve(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::retrieve(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;
        debug!(environment.logger, "Retrieving animal..."; "id" => id);

        let animal = environment
            .repository
            .get_by_id(id)
            .await
            .map_err(error_handler)?;

        json(&animal)
    }
}

pub async fn create(environment: Environment, submission: AnimalSubmission) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create(), e);

        let fields = submission.validate().map_err(error_handler)?;
        debug!(environment.logger, "Creating animal..."; "nombre" => &fields.nombre, "tipo" => &fields.tipo);

        let id = environment
            .repository
            .insert(fields)
            .await
            .map_err(error_handler)?;
        debug!(environment.logger, "Created animal"; "id" => id);

        with_header(
            with_status(json(&SuccessResponse::created(id)), StatusCode::CREATED),
            "location",
            environment.urls.animal(id).as_str(),
        )
    }
}

pub async fn update(
    environment: Environment,
    id: String,
    submission: AnimalSubmission,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::update(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;
        let fields = submission.validate().map_err(error_handler)?;
        debug!(environment.logger, "Updating animal..."; "id" => id);

        environment
            .repository
            .update(id, fields)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::updated())
    }
}

pub async fn delete(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::delete(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;
        debug!(environment.logger, "Deleting animal..."; "id" => id);

        environment
            .repository
            .delete(id)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::deleted())
    }
}

pub async fn stats(environment: Environment) -> RouteResult {
    timed! {
        let animals = environment
            .repository
            .list()
            .await
            .map_err(|e: BackendError| Rejection::new(Context::stats(), e))?;

        json(&Dashboard::new(&animals, environment.figures.figures()))
    }
}

pub async fn test(environment: Environment) -> RouteResult {
    timed! {
        let now = environment
            .repository
            .now()
            .await
            .map_err(|e: BackendError| Rejection::new(Context::test(), e))?;

        json(&SuccessResponse::liveness(now.unix_timestamp()))
    }
}

fn parse_id(id: &str) -> Result<Id, BackendError> {
    id.parse()
        .map_err(|_| BackendError::InvalidId(id.to_owned()))
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}

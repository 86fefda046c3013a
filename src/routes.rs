use std::sync::Arc;

use log::{debug, error, Logger};
use warp::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};
use warp::{Filter, Reply};

use crate::environment::Environment;
use crate::errors::BackendError;

mod handlers;
mod rejection;
mod response;

pub use internal::*;

/// The largest request body to accept. Animal submissions are small, so
/// anything beyond this is certainly not one.
const MAX_CONTENT_LENGTH: u64 = 64 * 1024;

/// Combines every API route and renders their errors as JSON.
pub fn make_routes(
    environment: Environment,
) -> impl Filter<Extract = impl Reply, Error = reject::Rejection> + Clone {
    let logger = environment.logger.clone();

    make_list_route(environment.clone())
        .or(make_list_by_type_route(environment.clone()))
        .or(make_retrieve_route(environment.clone()))
        .or(make_create_route(environment.clone()))
        .or(make_update_route(environment.clone()))
        .or(make_delete_route(environment.clone()))
        .or(make_stats_route(environment.clone()))
        .or(make_test_route(environment))
        .recover(move |r| format_rejection(logger.clone(), r))
}

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        let status = status_code_for(e);

        if status.is_server_error() {
            error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status, "message" => %r.error);
        } else {
            debug!(logger, "Request refused"; "context" => ?r.context, "status" => %status, "message" => %r.error);
        }

        return Ok(with_status(json(&r.flatten()), status));
    }

    // a body warp could not read as JSON at all is treated like a
    // malformed one
    if rej.find::<BodyDeserializeError>().is_some()
        || rej.find::<reject::UnsupportedMediaType>().is_some()
        || rej.find::<reject::LengthRequired>().is_some()
    {
        debug!(logger, "Malformed request body"; "rejection" => ?rej);
        let flattened = rejection::FlattenedRejection::without_context(&BackendError::MalformedBody);

        return Ok(with_status(json(&flattened), StatusCode::BAD_REQUEST));
    }

    let (status, message) = if rej.find::<reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
    } else if rej.find::<reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else if rej.is_not_found() {
        (StatusCode::NOT_FOUND, "not found")
    } else {
        error!(logger, "Unhandled rejection"; "rejection" => ?rej);
        (StatusCode::INTERNAL_SERVER_ERROR, rejection::INTERNAL_ERROR_MESSAGE)
    };

    debug!(logger, "Request refused"; "status" => %status);

    Ok(with_status(
        json(&rejection::FlattenedRejection::with_message(message)),
        status,
    ))
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        MissingFields | NegativeAge(..) | InvalidId(..) | MalformedBody => StatusCode::BAD_REQUEST,
        NonExistentId(..) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete as d, get as g, path as p, path::param as par, post, put};

    use super::{handlers, MAX_CONTENT_LENGTH};
    use crate::animal::AnimalSubmission;
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    fn submission() -> BoxedFilter<(AnimalSubmission,)> {
        warp::body::content_length_limit(MAX_CONTENT_LENGTH)
            .and(warp::body::json())
            .boxed()
    }

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let r = environment.urls.api_path.clone();

            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p(r));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_list_route => list, rt; p("animals"), end(), g());
    route!(make_list_by_type_route => list_by_type, rt; p("animals"), p("tipo"), par::<String>(), end(), g());
    route!(make_retrieve_route => retrieve, rt; p("animals"), par::<String>(), end(), g());
    route!(make_create_route => create, rt; p("animals"), end(), post(), submission());
    route!(make_update_route => update, rt; p("animals"), par::<String>(), end(), put(), submission());
    route!(make_delete_route => delete, rt; p("animals"), par::<String>(), end(), d());
    route!(make_stats_route => stats, rt; p("stats"), end(), g());
    route!(make_test_route => test, rt; p("test"), end(), g());
}

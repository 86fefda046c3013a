//! The client side of the API: a service calling the HTTP routes, and the
//! client's own naming of animal records.

use futures::future::{BoxFuture, FutureExt};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::animal::{Animal, AnimalFields, AnimalSubmission, Id};
use crate::config::API_PATH;
use crate::dashboard::Dashboard;
use crate::db::Repository;
use crate::errors::BackendError;
use crate::urls::Urls;

/// An animal as the client names it: the registration time is
/// `fechaRegistro` rather than the store's `fecha_registro`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAnimal {
    pub id: Id,
    pub nombre: String,
    pub tipo: String,
    pub genero: String,
    pub edad: i32,
    pub region: String,
    pub descripcion: Option<String>,
    pub imagen: Option<String>,
    #[serde(with = "time::serde::timestamp")]
    pub fecha_registro: OffsetDateTime,
}

impl From<Animal> for ClientAnimal {
    fn from(animal: Animal) -> Self {
        ClientAnimal {
            id: animal.id,
            nombre: animal.nombre,
            tipo: animal.tipo,
            genero: animal.genero,
            edad: animal.edad,
            region: animal.region,
            descripcion: animal.descripcion,
            imagen: animal.imagen,
            fecha_registro: animal.fecha_registro,
        }
    }
}

impl From<ClientAnimal> for Animal {
    fn from(animal: ClientAnimal) -> Self {
        Animal {
            id: animal.id,
            nombre: animal.nombre,
            tipo: animal.tipo,
            genero: animal.genero,
            edad: animal.edad,
            region: animal.region,
            descripcion: animal.descripcion,
            imagen: animal.imagen,
            fecha_registro: animal.fecha_registro,
        }
    }
}

/// The answer of the liveness probe.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Liveness {
    pub message: String,
    pub timestamp: i64,
}

#[derive(Deserialize)]
struct Created {
    id: Id,
}

#[derive(Deserialize)]
struct Acknowledgement {}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Calls the catalog API over HTTP. Every failure, whether in transport
/// or reported by the server, becomes `BackendError::Network` with a
/// message fit for showing to a user.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    urls: Urls,
}

impl ApiClient {
    /// `base` is the server's top-level URL, without the API path.
    pub fn new(base: &Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(http: reqwest::Client, base: &Url) -> Self {
        ApiClient {
            http,
            urls: Urls::new(base, API_PATH),
        }
    }

    /// Checks that the server and its store are reachable.
    pub async fn test_connection(&self) -> Result<Liveness, BackendError> {
        fetch(self.http.get(self.urls.test()), "connect to the server").await
    }

    /// Fetches the dashboard figures.
    pub async fn stats(&self) -> Result<Dashboard, BackendError> {
        fetch(self.http.get(self.urls.stats()), "load the statistics").await
    }
}

async fn fetch<T: DeserializeOwned>(
    request: RequestBuilder,
    action: &'static str,
) -> Result<T, BackendError> {
    let failure = |detail: String| BackendError::Network {
        message: format!("could not {}: {}", action, detail),
    };

    let response = request.send().await.map_err(|e| failure(e.to_string()))?;
    let status = response.status();

    if !status.is_success() {
        let detail = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("HTTP {}", status),
        };

        return Err(failure(detail));
    }

    response.json::<T>().await.map_err(|e| failure(e.to_string()))
}

impl Repository for ApiClient {
    fn list(&self) -> BoxFuture<Result<Vec<Animal>, BackendError>> {
        fetch(self.http.get(self.urls.animals()), "load the animals").boxed()
    }

    fn list_by_type(&self, tipo: &str) -> BoxFuture<Result<Vec<Animal>, BackendError>> {
        fetch(
            self.http.get(self.urls.animals_of_type(tipo)),
            "filter the animals",
        )
        .boxed()
    }

    fn get_by_id(&self, id: Id) -> BoxFuture<Result<Animal, BackendError>> {
        fetch(self.http.get(self.urls.animal(id)), "load the animal").boxed()
    }

    fn insert(&self, fields: AnimalFields) -> BoxFuture<Result<Id, BackendError>> {
        let request = self
            .http
            .post(self.urls.animals())
            .json(&AnimalSubmission::from(fields));

        async move {
            let Created { id } = fetch(request, "create the animal").await?;

            Ok(id)
        }
        .boxed()
    }

    fn update(&self, id: Id, fields: AnimalFields) -> BoxFuture<Result<(), BackendError>> {
        let request = self
            .http
            .put(self.urls.animal(id))
            .json(&AnimalSubmission::from(fields));

        async move {
            let Acknowledgement {} = fetch(request, "update the animal").await?;

            Ok(())
        }
        .boxed()
    }

    fn delete(&self, id: Id) -> BoxFuture<Result<(), BackendError>> {
        let request = self.http.delete(self.urls.animal(id));

        async move {
            let Acknowledgement {} = fetch(request, "delete the animal").await?;

            Ok(())
        }
        .boxed()
    }

    fn now(&self) -> BoxFuture<Result<OffsetDateTime, BackendError>> {
        async move {
            let liveness = self.test_connection().await?;

            Ok(OffsetDateTime::from_unix_timestamp(liveness.timestamp))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    prop_compose! {
        fn animals()(
            id in 1i64..1_000_000,
            nombre in "\\PC+",
            tipo in "(perro|gato|conejo)",
            genero in "(macho|hembra)",
            edad in 0i32..30,
            region in "\\PC+",
            descripcion in proptest::option::of("\\PC*"),
            imagen in proptest::option::of("https://[a-z]{1,10}\\.cl/[a-z0-9]{1,10}\\.jpg"),
            seconds in 0i64..4_000_000_000,
        ) -> Animal {
            Animal {
                id,
                nombre,
                tipo,
                genero,
                edad,
                region,
                descripcion,
                imagen,
                fecha_registro: OffsetDateTime::from_unix_timestamp(seconds),
            }
        }
    }

    proptest! {
        #[test]
        fn translation_round_trips(animal in animals()) {
            let translated = ClientAnimal::from(animal.clone());

            prop_assert_eq!(translated.fecha_registro, animal.fecha_registro);
            prop_assert_eq!(Animal::from(translated), animal);
        }
    }

    #[test]
    fn client_names_the_timestamp_in_camel_case() {
        let animal = ClientAnimal {
            id: 3,
            nombre: "Rocky".to_owned(),
            tipo: "perro".to_owned(),
            genero: "macho".to_owned(),
            edad: 5,
            region: "Biobío".to_owned(),
            descripcion: None,
            imagen: None,
            fecha_registro: OffsetDateTime::from_unix_timestamp(1_600_000_000),
        };

        let value = serde_json::to_value(&animal).expect("serialize client animal");

        assert_eq!(value["fechaRegistro"], 1_600_000_000);
        assert!(value.get("fecha_registro").is_none());
    }
}

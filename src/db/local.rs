//! An animal store kept as a single serialized block on the local
//! filesystem, for running the catalog without a database.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use log::{debug, info, Logger};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::animal::{newest_first, Animal, AnimalFields, Id};
use crate::errors::BackendError;

/// The key the whole collection is stored under.
pub const STORAGE_KEY: &str = "animales_data";

/// The current layout of the stored block.
pub const STORAGE_VERSION: u32 = 1;

#[derive(Debug, Deserialize, Serialize)]
struct Block {
    version: u32,

    /// The last ID handed out. IDs are never reused, even after the
    /// animal holding the highest one is deleted.
    last_id: Id,

    animals: Vec<Animal>,
}

impl Block {
    fn empty() -> Self {
        Block {
            version: STORAGE_VERSION,
            last_id: 0,
            animals: vec![],
        }
    }

    fn max_id(&self) -> Id {
        self.animals.iter().map(|a| a.id).max().unwrap_or(0)
    }

    fn push(&mut self, fields: AnimalFields) -> Id {
        // the clock may step backwards, but listing order must not
        let newest = self.animals.iter().map(|a| a.fecha_registro).max();
        let now = OffsetDateTime::now_utc();
        let fecha_registro = newest.map_or(now, |newest| newest.max(now));

        self.last_id += 1;
        self.animals
            .push(Animal::new(self.last_id, fields, fecha_registro));

        self.last_id
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

pub struct LocalRepository {
    logger: Arc<Logger>,
    directory: PathBuf,
    path: PathBuf,

    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl LocalRepository {
    /// Creates a store in `directory` without touching the filesystem.
    /// Callers outside this module go through `open`, which also
    /// bootstraps the block.
    fn new(logger: Arc<Logger>, directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let path = directory.join(format!("{}.json", STORAGE_KEY));

        LocalRepository {
            logger,
            directory,
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates `directory` if necessary and bootstraps the store in it.
    pub async fn open(
        logger: Arc<Logger>,
        directory: impl Into<PathBuf>,
    ) -> Result<Self, BackendError> {
        let repository = LocalRepository::new(logger, directory);

        tokio::fs::create_dir_all(&repository.directory).await?;
        repository.bootstrap().await?;

        Ok(repository)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Seeds the example animals if nothing has been stored yet.
    /// Otherwise leaves the stored animals untouched and makes sure the
    /// next ID is above every existing one. Running it again changes
    /// nothing.
    pub async fn bootstrap(&self) -> Result<(), BackendError> {
        let _guard = self.write_lock.lock().await;

        match self.load().await? {
            None => {
                let mut block = Block::empty();

                for fields in examples() {
                    block.push(fields);
                }

                info!(self.logger, "Seeded local storage with example animals"; "count" => block.animals.len(), "path" => %self.path.display());
                self.save(&block).await
            }
            Some(mut block) => {
                info!(self.logger, "Loaded local storage"; "count" => block.animals.len(), "last_id" => block.last_id);

                let max_id = block.max_id();

                if block.last_id < max_id {
                    debug!(self.logger, "Raising last ID to match stored animals"; "from" => block.last_id, "to" => max_id);
                    block.last_id = max_id;
                    self.save(&block).await?;
                }

                Ok(())
            }
        }
    }

    async fn load(&self) -> Result<Option<Block>, BackendError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let VersionProbe { version } = serde_json::from_slice(&raw)
            .map_err(|source| BackendError::CorruptStorage { source })?;

        if version != STORAGE_VERSION {
            return Err(BackendError::UnsupportedStorageVersion { version });
        }

        let block = serde_json::from_slice(&raw)
            .map_err(|source| BackendError::CorruptStorage { source })?;

        Ok(Some(block))
    }

    async fn load_or_empty(&self) -> Result<Block, BackendError> {
        Ok(self.load().await?.unwrap_or_else(Block::empty))
    }

    /// Replaces the stored block. The new contents are written to a
    /// temporary file next to the old one, then renamed over it.
    async fn save(&self, block: &Block) -> Result<(), BackendError> {
        use tempfile::NamedTempFile;

        let raw = serde_json::to_vec(block).map_err(|source| BackendError::StorageEncoding { source })?;
        let directory = self.directory.clone();
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut file = NamedTempFile::new_in(&directory)?;
            file.write_all(&raw)?;
            file.as_file().sync_all()?;
            file.persist(&path).map_err(|e| e.error)?;

            Ok(())
        })
        .await??;

        Ok(())
    }

    async fn sorted(&self) -> Result<Vec<Animal>, BackendError> {
        let mut animals = self.load_or_empty().await?.animals;
        animals.sort_by(newest_first);

        Ok(animals)
    }

    async fn find(&self, id: Id) -> Result<Animal, BackendError> {
        self.load_or_empty()
            .await?
            .animals
            .into_iter()
            .find(|a| a.id == id)
            .ok_or(BackendError::NonExistentId(id))
    }

    async fn insert_fields(&self, fields: AnimalFields) -> Result<Id, BackendError> {
        let _guard = self.write_lock.lock().await;

        let mut block = self.load_or_empty().await?;
        let id = block.push(fields);
        self.save(&block).await?;

        debug!(self.logger, "Stored animal"; "id" => id);

        Ok(id)
    }

    async fn replace(&self, id: Id, fields: AnimalFields) -> Result<(), BackendError> {
        let _guard = self.write_lock.lock().await;

        let mut block = self.load_or_empty().await?;
        let animal = block
            .animals
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(BackendError::NonExistentId(id))?;
        animal.replace_fields(fields);

        self.save(&block).await
    }

    async fn remove(&self, id: Id) -> Result<(), BackendError> {
        let _guard = self.write_lock.lock().await;

        let mut block = self.load_or_empty().await?;
        let position = block
            .animals
            .iter()
            .position(|a| a.id == id)
            .ok_or(BackendError::NonExistentId(id))?;
        block.animals.remove(position);

        self.save(&block).await
    }
}

impl super::Repository for LocalRepository {
    fn list(&self) -> BoxFuture<Result<Vec<Animal>, BackendError>> {
        self.sorted().boxed()
    }

    fn list_by_type(&self, tipo: &str) -> BoxFuture<Result<Vec<Animal>, BackendError>> {
        let tipo = tipo.to_owned();

        async move {
            let mut animals = self.sorted().await?;
            animals.retain(|a| a.tipo == tipo);

            Ok(animals)
        }
        .boxed()
    }

    fn get_by_id(&self, id: Id) -> BoxFuture<Result<Animal, BackendError>> {
        self.find(id).boxed()
    }

    fn insert(&self, fields: AnimalFields) -> BoxFuture<Result<Id, BackendError>> {
        self.insert_fields(fields).boxed()
    }

    fn update(&self, id: Id, fields: AnimalFields) -> BoxFuture<Result<(), BackendError>> {
        self.replace(id, fields).boxed()
    }

    fn delete(&self, id: Id) -> BoxFuture<Result<(), BackendError>> {
        self.remove(id).boxed()
    }

    fn now(&self) -> BoxFuture<Result<OffsetDateTime, BackendError>> {
        futures::future::ok(OffsetDateTime::now_utc()).boxed()
    }
}

/// The animals a fresh store starts with.
fn examples() -> Vec<AnimalFields> {
    let example = |nombre: &str,
                   tipo: &str,
                   genero: &str,
                   edad: i32,
                   region: &str,
                   descripcion: &str,
                   imagen: &str| AnimalFields {
        nombre: nombre.to_owned(),
        tipo: tipo.to_owned(),
        genero: genero.to_owned(),
        edad,
        region: region.to_owned(),
        descripcion: Some(descripcion.to_owned()),
        imagen: Some(imagen.to_owned()),
    };

    vec![
        example(
            "Firulais",
            "perro",
            "macho",
            3,
            "Metropolitana",
            "Perro juguetón y cariñoso",
            "https://images.dog.ceo/breeds/terrier-norwich/n02094258_1003.jpg",
        ),
        example(
            "Luna",
            "perro",
            "hembra",
            2,
            "Valparaíso",
            "Perrita tranquila y leal",
            "https://images.dog.ceo/breeds/retriever-golden/n02099601_1722.jpg",
        ),
        example(
            "Rocky",
            "perro",
            "macho",
            5,
            "Biobío",
            "Le encanta jugar a la pelota",
            "https://images.dog.ceo/breeds/labrador/n02099712_986.jpg",
        ),
        example(
            "Michi",
            "gato",
            "hembra",
            1,
            "Metropolitana",
            "Gatita juguetona y curiosa",
            "https://cdn2.thecatapi.com/images/3ut.jpg",
        ),
        example(
            "Simba",
            "gato",
            "macho",
            3,
            "Valparaíso",
            "Gato independiente pero cariñoso",
            "https://cdn2.thecatapi.com/images/MTY3ODkwMg.jpg",
        ),
        example(
            "Nina",
            "gato",
            "hembra",
            2,
            "O'Higgins",
            "Gatita muy tranquila, ideal para departamento",
            "https://cdn2.thecatapi.com/images/9u7.jpg",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::db::Repository;

    async fn open_store() -> (TempDir, LocalRepository) {
        let directory = tempfile::tempdir().expect("create temporary directory");
        let repository = LocalRepository::open(Arc::new(log::discard()), directory.path())
            .await
            .expect("open local repository");

        (directory, repository)
    }

    fn rex() -> AnimalFields {
        AnimalFields {
            nombre: "Rex".to_owned(),
            tipo: "perro".to_owned(),
            genero: "macho".to_owned(),
            edad: 4,
            region: "Metropolitana".to_owned(),
            descripcion: None,
            imagen: None,
        }
    }

    fn ids(animals: &[Animal]) -> Vec<Id> {
        animals.iter().map(|a| a.id).collect()
    }

    /// Writes a block in which the older ID was registered later.
    fn write_out_of_order_block(directory: &Path) {
        let animal = |id: Id, nombre: &str, tipo: &str, fecha_registro: i64| {
            serde_json::json!({
                "id": id,
                "nombre": nombre,
                "tipo": tipo,
                "genero": "hembra",
                "edad": 3,
                "region": "Maule",
                "descripcion": null,
                "imagen": null,
                "fecha_registro": fecha_registro,
            })
        };
        let block = serde_json::json!({
            "version": STORAGE_VERSION,
            "last_id": 3,
            "animals": [
                animal(2, "Canela", "perro", 1_700_000_000),
                animal(3, "Tom", "gato", 1_700_000_050),
                animal(1, "Bobby", "perro", 1_700_000_100),
            ],
        });

        std::fs::write(
            directory.join(format!("{}.json", STORAGE_KEY)),
            serde_json::to_vec(&block).expect("serialize block"),
        )
        .expect("write block");
    }

    #[tokio::test]
    async fn listings_follow_registration_time_not_ids() {
        let directory = tempfile::tempdir().expect("create temporary directory");
        write_out_of_order_block(directory.path());

        let repository = LocalRepository::open(Arc::new(log::discard()), directory.path())
            .await
            .expect("open local repository");

        assert_eq!(
            ids(&repository.list().await.expect("list animals")),
            vec![1, 3, 2]
        );
        assert_eq!(
            ids(&repository.list_by_type("perro").await.expect("list dogs")),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn fresh_store_is_seeded() {
        let (_directory, repository) = open_store().await;

        let animals = repository.list().await.expect("list animals");

        assert_eq!(ids(&animals), vec![6, 5, 4, 3, 2, 1]);
        assert_eq!(animals[5].nombre, "Firulais");
        assert_eq!(animals[0].nombre, "Nina");
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let (_directory, repository) = open_store().await;

        let before = repository.list().await.expect("list animals");
        repository.bootstrap().await.expect("bootstrap again");
        let after = repository.list().await.expect("list animals");

        assert_eq!(before, after);
        assert_eq!(repository.insert(rex()).await.expect("insert Rex"), 7);
    }

    #[tokio::test]
    async fn bootstrap_keeps_existing_animals() {
        let (directory, repository) = open_store().await;

        repository.delete(2).await.expect("delete Luna");
        let id = repository.insert(rex()).await.expect("insert Rex");

        let reopened = LocalRepository::open(Arc::new(log::discard()), directory.path())
            .await
            .expect("reopen local repository");
        let animals = reopened.list().await.expect("list animals");

        assert_eq!(id, 7);
        assert_eq!(ids(&animals), vec![7, 6, 5, 4, 3, 1]);
    }

    #[tokio::test]
    async fn ids_increase_and_are_never_reused() {
        let (_directory, repository) = open_store().await;

        let first = repository.insert(rex()).await.expect("insert first");
        repository.delete(first).await.expect("delete first");
        let second = repository.insert(rex()).await.expect("insert second");

        assert!(second > first);
        assert_eq!(
            repository.get_by_id(second).await.expect("get second").nombre,
            "Rex"
        );
    }

    #[tokio::test]
    async fn listing_by_type_is_an_ordered_subset() {
        let (_directory, repository) = open_store().await;
        let kitten = AnimalFields {
            nombre: "Pelusa".to_owned(),
            tipo: "gato".to_owned(),
            ..rex()
        };
        repository.insert(kitten).await.expect("insert kitten");

        let all = repository.list().await.expect("list animals");
        let cats = repository.list_by_type("gato").await.expect("list cats");

        let expected: Vec<Animal> = all.into_iter().filter(|a| a.tipo == "gato").collect();
        assert_eq!(cats, expected);
        assert_eq!(ids(&cats), vec![7, 6, 5, 4]);
        assert!(repository
            .list_by_type("Gato")
            .await
            .expect("list by mismatched case")
            .is_empty());
    }

    #[tokio::test]
    async fn update_replaces_fields_but_not_identity() {
        let (_directory, repository) = open_store().await;
        let original = repository.get_by_id(1).await.expect("get Firulais");

        repository.update(1, rex()).await.expect("update Firulais");
        let updated = repository.get_by_id(1).await.expect("get updated animal");

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.fecha_registro, original.fecha_registro);
        assert_eq!(updated.fields(), rex());
        assert_eq!(updated.descripcion, None);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (_directory, repository) = open_store().await;

        assert!(matches!(
            repository.get_by_id(99).await,
            Err(BackendError::NonExistentId(99))
        ));
        assert!(matches!(
            repository.update(99, rex()).await,
            Err(BackendError::NonExistentId(99))
        ));
        assert!(matches!(
            repository.delete(99).await,
            Err(BackendError::NonExistentId(99))
        ));
        assert_eq!(repository.list().await.expect("list animals").len(), 6);
    }

    #[tokio::test]
    async fn block_records_its_version() {
        let (_directory, repository) = open_store().await;

        let raw = std::fs::read(repository.path()).expect("read block");
        let value: serde_json::Value = serde_json::from_slice(&raw).expect("parse block");

        assert_eq!(value["version"], STORAGE_VERSION);
        assert_eq!(value["last_id"], 6);
    }

    #[tokio::test]
    async fn unknown_versions_are_refused() {
        let directory = tempfile::tempdir().expect("create temporary directory");
        let path = directory.path().join(format!("{}.json", STORAGE_KEY));
        std::fs::write(&path, r#"{"version": 2, "last_id": 0, "animals": []}"#)
            .expect("write block");

        let result = LocalRepository::open(Arc::new(log::discard()), directory.path()).await;

        assert!(matches!(
            result,
            Err(BackendError::UnsupportedStorageVersion { version: 2 })
        ));
    }

    #[tokio::test]
    async fn corrupt_blocks_are_reported() {
        let directory = tempfile::tempdir().expect("create temporary directory");
        let path = directory.path().join(format!("{}.json", STORAGE_KEY));
        std::fs::write(&path, "[]").expect("write block");

        let repository = LocalRepository::new(Arc::new(log::discard()), directory.path());

        assert!(matches!(
            repository.list().await,
            Err(BackendError::CorruptStorage { .. })
        ));
    }
}

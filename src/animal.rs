use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::errors::BackendError;

/// An ID in the store.
pub type Id = i64;

/// A single animal in the catalog, as stored and as sent over the wire.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, sqlx::FromRow)]
pub struct Animal {
    /// The ID assigned by the store.
    pub id: Id,

    /// The animal's name.
    pub nombre: String,

    /// The kind of animal, e.g. `perro` or `gato`.
    pub tipo: String,

    /// The animal's gender.
    pub genero: String,

    /// The animal's age in years.
    pub edad: i32,

    /// The region where the animal can be adopted.
    pub region: String,

    /// A free-form description, if any.
    pub descripcion: Option<String>,

    /// A URI pointing to a picture of the animal, if any.
    pub imagen: Option<String>,

    /// The date and time the animal was registered.
    #[serde(with = "time::serde::timestamp")]
    pub fecha_registro: OffsetDateTime,
}

impl Animal {
    pub fn new(id: Id, fields: AnimalFields, fecha_registro: OffsetDateTime) -> Self {
        let AnimalFields {
            nombre,
            tipo,
            genero,
            edad,
            region,
            descripcion,
            imagen,
        } = fields;

        Animal {
            id,
            nombre,
            tipo,
            genero,
            edad,
            region,
            descripcion,
            imagen,
            fecha_registro,
        }
    }

    /// Replaces every mutable field, keeping the ID and registration time.
    pub fn replace_fields(&mut self, fields: AnimalFields) {
        *self = Animal::new(self.id, fields, self.fecha_registro);
    }

    /// The mutable part of the record.
    pub fn fields(&self) -> AnimalFields {
        AnimalFields {
            nombre: self.nombre.clone(),
            tipo: self.tipo.clone(),
            genero: self.genero.clone(),
            edad: self.edad,
            region: self.region.clone(),
            descripcion: self.descripcion.clone(),
            imagen: self.imagen.clone(),
        }
    }
}

/// The validated, mutable fields of an animal.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnimalFields {
    pub nombre: String,
    pub tipo: String,
    pub genero: String,
    pub edad: i32,
    pub region: String,
    pub descripcion: Option<String>,
    pub imagen: Option<String>,
}

/// The body of a creation or update request, before validation.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AnimalSubmission {
    #[serde(default)]
    pub nombre: Option<String>,

    #[serde(default)]
    pub tipo: Option<String>,

    #[serde(default)]
    pub genero: Option<String>,

    #[serde(default)]
    pub edad: Option<i32>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub descripcion: Option<String>,

    #[serde(default)]
    pub imagen: Option<String>,
}

impl AnimalSubmission {
    /// Checks that every required field is present and non-blank.
    ///
    /// Optional fields that are blank are treated as absent.
    ///
    /// ```
    /// use petmatch::animal::AnimalSubmission;
    ///
    /// let submission = AnimalSubmission {
    ///     nombre: Some("Rex".to_owned()),
    ///     tipo: Some("perro".to_owned()),
    ///     genero: Some("macho".to_owned()),
    ///     edad: Some(4),
    ///     region: Some("Metropolitana".to_owned()),
    ///     ..Default::default()
    /// };
    ///
    /// assert_eq!(submission.validate().unwrap().nombre, "Rex");
    /// ```
    pub fn validate(self) -> Result<AnimalFields, BackendError> {
        let nombre = required(self.nombre)?;
        let tipo = required(self.tipo)?;
        let genero = required(self.genero)?;
        let edad = self.edad.ok_or(BackendError::MissingFields)?;
        let region = required(self.region)?;

        if edad < 0 {
            return Err(BackendError::NegativeAge(edad));
        }

        Ok(AnimalFields {
            nombre,
            tipo,
            genero,
            edad,
            region,
            descripcion: optional(self.descripcion),
            imagen: optional(self.imagen),
        })
    }
}

impl From<AnimalFields> for AnimalSubmission {
    fn from(fields: AnimalFields) -> Self {
        AnimalSubmission {
            nombre: Some(fields.nombre),
            tipo: Some(fields.tipo),
            genero: Some(fields.genero),
            edad: Some(fields.edad),
            region: Some(fields.region),
            descripcion: fields.descripcion,
            imagen: fields.imagen,
        }
    }
}

fn required(value: Option<String>) -> Result<String, BackendError> {
    optional(value).ok_or(BackendError::MissingFields)
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Orders animals most recently registered first, newest ID first among
/// animals registered at the same instant.
pub fn newest_first(a: &Animal, b: &Animal) -> std::cmp::Ordering {
    b.fecha_registro
        .cmp(&a.fecha_registro)
        .then_with(|| b.id.cmp(&a.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rex() -> AnimalSubmission {
        serde_json::from_str(
            r#"{"nombre": "Rex", "tipo": "perro", "genero": "macho", "edad": 4, "region": "Metropolitana"}"#,
        )
        .expect("parse submission")
    }

    #[test]
    fn complete_submission_is_accepted() {
        let fields = rex().validate().expect("validate submission");

        assert_eq!(fields.nombre, "Rex");
        assert_eq!(fields.edad, 4);
        assert_eq!(fields.descripcion, None);
        assert_eq!(fields.imagen, None);
    }

    #[test]
    fn missing_or_blank_fields_are_rejected() {
        let without_name = AnimalSubmission {
            nombre: None,
            ..rex()
        };
        let blank_region = AnimalSubmission {
            region: Some("  ".to_owned()),
            ..rex()
        };
        let without_age = AnimalSubmission {
            edad: None,
            ..rex()
        };

        for submission in vec![without_name, blank_region, without_age] {
            assert!(matches!(
                submission.validate(),
                Err(BackendError::MissingFields)
            ));
        }
    }

    #[test]
    fn zero_age_is_allowed_but_negative_is_not() {
        let newborn = AnimalSubmission {
            edad: Some(0),
            ..rex()
        };
        assert_eq!(newborn.validate().expect("validate newborn").edad, 0);

        let impossible = AnimalSubmission {
            edad: Some(-1),
            ..rex()
        };
        assert!(matches!(
            impossible.validate(),
            Err(BackendError::NegativeAge(-1))
        ));
    }

    #[test]
    fn replacing_fields_keeps_identity() {
        let registered = OffsetDateTime::from_unix_timestamp(1_600_000_000);
        let mut animal = Animal::new(7, rex().validate().unwrap(), registered);

        let mut fields = animal.fields();
        fields.nombre = "Max".to_owned();
        fields.descripcion = Some("Muy tranquilo".to_owned());
        animal.replace_fields(fields);

        assert_eq!(animal.id, 7);
        assert_eq!(animal.fecha_registro, registered);
        assert_eq!(animal.nombre, "Max");
        assert_eq!(animal.descripcion.as_deref(), Some("Muy tranquilo"));
    }

    #[test]
    fn timestamp_uses_snake_case_on_the_wire() {
        let registered = OffsetDateTime::from_unix_timestamp(1_600_000_000);
        let animal = Animal::new(1, rex().validate().unwrap(), registered);

        let value = serde_json::to_value(&animal).expect("serialize animal");

        assert_eq!(value["fecha_registro"], 1_600_000_000);
        assert!(value.get("fechaRegistro").is_none());
    }
}

//! Dashboard statistics. Live counts come from the animal store; the
//! remaining figures come from a separate source that is, for now, a
//! fixed placeholder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::animal::Animal;

/// Figures the dashboard shows that are not derived from the animal store.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ExternalFigures {
    pub adopted: u32,
    pub rescued: u32,
    pub volunteers: u32,

    /// Whether these numbers are placeholders rather than real data.
    pub placeholder: bool,
}

pub trait Figures {
    fn figures(&self) -> ExternalFigures;
}

/// Hardcoded figures standing in for a real statistics source.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaceholderFigures;

impl Figures for PlaceholderFigures {
    fn figures(&self) -> ExternalFigures {
        ExternalFigures {
            adopted: 120,
            rescued: 250,
            volunteers: 45,
            placeholder: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Dashboard {
    /// Animals currently listed.
    pub available: usize,

    /// Animals currently listed, per `tipo`.
    pub by_type: BTreeMap<String, usize>,

    #[serde(flatten)]
    pub external: ExternalFigures,
}

impl Dashboard {
    pub fn new(animals: &[Animal], external: ExternalFigures) -> Self {
        let mut by_type = BTreeMap::new();

        for animal in animals {
            *by_type.entry(animal.tipo.clone()).or_insert(0) += 1;
        }

        Dashboard {
            available: animals.len(),
            by_type,
            external,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::animal::AnimalFields;

    fn animal(id: i64, tipo: &str) -> Animal {
        let fields = AnimalFields {
            nombre: format!("Animal {}", id),
            tipo: tipo.to_owned(),
            genero: "hembra".to_owned(),
            edad: 2,
            region: "Biobío".to_owned(),
            descripcion: None,
            imagen: None,
        };

        Animal::new(id, fields, OffsetDateTime::from_unix_timestamp(1_600_000_000 + id))
    }

    #[test]
    fn live_counts_are_grouped_by_type() {
        let animals = vec![animal(1, "perro"), animal(2, "gato"), animal(3, "perro")];

        let dashboard = Dashboard::new(&animals, PlaceholderFigures.figures());

        assert_eq!(dashboard.available, 3);
        assert_eq!(dashboard.by_type.get("perro"), Some(&2));
        assert_eq!(dashboard.by_type.get("gato"), Some(&1));
    }

    #[test]
    fn placeholder_figures_are_flagged() {
        let value = serde_json::to_value(Dashboard::new(&[], PlaceholderFigures.figures()))
            .expect("serialize dashboard");

        assert_eq!(value["available"], 0);
        assert_eq!(value["placeholder"], true);
    }
}

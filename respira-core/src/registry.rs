use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A monitoring location known to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: u32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(id: u32, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("location registry must contain at least one location")]
    Empty,

    #[error("duplicate location id {0} in registry")]
    DuplicateId(u32),
}

/// Fixed, ordered list of locations. The first entry is the default selection.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRegistry {
    locations: Vec<Location>,
}

const MONTERREY: &[(u32, &str, f64, f64)] = &[
    (1, "Santa Catarina", 25.67325, -100.45813),
    (2, "San Pedro Garza Garcia", 25.65716, -100.40268),
    (3, "San Nicolas de los Garza", 25.74167, -100.30222),
    (4, "Parque Industrial Ciudad Mitras", 25.78861, -100.44778),
    (5, "Monterrey", 25.67507, -100.31847),
    (6, "Ladrillera (Entronque Pesqueria)", 25.75, -100.1),
    (7, "Guadalupe", 25.67678, -100.25646),
    (8, "General Escobedo", 25.800555555556, -100.34444444444),
    (9, "Garcia", 25.783333333333, -100.58583333333),
    (10, "Cuidad Benito Juarez", 25.64724, -100.09582),
    (11, "Ciudad de Allende", 25.27673, -100.01442),
    (12, "Ciudad Apodaca", 25.79002, -100.18639),
    (13, "Cadereyta Jimenez", 25.58896, -100.00156),
];

impl LocationRegistry {
    pub fn new(locations: Vec<Location>) -> Result<Self, RegistryError> {
        if locations.is_empty() {
            return Err(RegistryError::Empty);
        }

        for (i, loc) in locations.iter().enumerate() {
            if locations[..i].iter().any(|other| other.id == loc.id) {
                return Err(RegistryError::DuplicateId(loc.id));
            }
        }

        Ok(Self { locations })
    }

    /// Monitoring locations of the Monterrey metropolitan network.
    pub fn monterrey() -> Self {
        let locations = MONTERREY
            .iter()
            .map(|(id, name, lat, lon)| Location::new(*id, *name, *lat, *lon))
            .collect();

        Self { locations }
    }

    pub fn default_location(&self) -> &Location {
        &self.locations[0]
    }

    pub fn get(&self, id: u32) -> Option<&Location> {
        self.locations.iter().find(|loc| loc.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Location> {
        let wanted = name.trim();
        self.locations.iter().find(|loc| loc.name.eq_ignore_ascii_case(wanted))
    }

    /// Resolve a user-supplied selector: a numeric id or a location name.
    pub fn resolve(&self, selector: &str) -> Option<&Location> {
        match selector.trim().parse::<u32>() {
            Ok(id) => self.get(id),
            Err(_) => self.find_by_name(selector),
        }
    }

    pub fn as_slice(&self) -> &[Location] {
        &self.locations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl Default for LocationRegistry {
    fn default() -> Self {
        Self::monterrey()
    }
}

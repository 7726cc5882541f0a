//! Municipalities of Tarlac province used for the geographic rollup.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Municipality {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

const fn m(name: &'static str, latitude: f64, longitude: f64) -> Municipality {
    Municipality {
        name,
        latitude,
        longitude,
    }
}

pub const MUNICIPALITIES: [Municipality; 18] = [
    m("Anao", 15.7306, 120.6278),
    m("Bamban", 15.2743, 120.5647),
    m("Camiling", 15.6867, 120.4131),
    m("Capas", 15.3297, 120.5897),
    m("Concepcion", 15.3247, 120.6556),
    m("Gerona", 15.6069, 120.5983),
    m("La Paz", 15.4417, 120.7289),
    m("Mayantoc", 15.6194, 120.3778),
    m("Moncada", 15.7333, 120.5722),
    m("Paniqui", 15.6686, 120.5806),
    m("Pura", 15.6247, 120.6481),
    m("Ramos", 15.6667, 120.6417),
    m("San Clemente", 15.7111, 120.3600),
    m("San Jose", 15.4614, 120.4656),
    m("San Manuel", 15.7983, 120.6050),
    m("Santa Ignacia", 15.6136, 120.4372),
    m("Tarlac City", 15.4802, 120.5979),
    m("Victoria", 15.5778, 120.6814),
];

/// Case-insensitive lookup by name.
pub fn find(name: &str) -> Option<&'static Municipality> {
    let needle = name.trim();
    MUNICIPALITIES
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(needle))
}

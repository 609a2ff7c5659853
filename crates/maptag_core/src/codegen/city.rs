//! City token lookup by bounding box.

use crate::geo::OpenBox;

/// Token used when a point falls outside every known city area.
pub const FALLBACK_CITY_TOKEN: &str = "OTH";

/// Named bounding box mapped to a three-letter city token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CityArea {
    pub name: &'static str,
    pub token: &'static str,
    pub area: OpenBox,
}

/// Ordered city table. The first matching area wins.
pub const CITY_AREAS: &[CityArea] = &[
    CityArea {
        name: "Ouagadougou",
        token: "OUA",
        area: OpenBox::new(12.2, 12.5, -1.7, -1.3),
    },
    CityArea {
        name: "Bobo-Dioulasso",
        token: "BOB",
        area: OpenBox::new(11.0, 11.3, -4.5, -4.0),
    },
    CityArea {
        name: "Koudougou",
        token: "KOU",
        area: OpenBox::new(12.1, 12.4, -2.5, -2.2),
    },
    CityArea {
        name: "Banfora",
        token: "BAN",
        area: OpenBox::new(10.5, 10.8, -4.9, -4.6),
    },
    CityArea {
        name: "Ouahigouya",
        token: "OHG",
        area: OpenBox::new(13.4, 13.7, -2.6, -2.2),
    },
    CityArea {
        name: "Fada N'Gourma",
        token: "FAD",
        area: OpenBox::new(11.9, 12.2, 0.2, 0.5),
    },
];

/// Returns the city token for a point; pure function of `(lat, lon)`.
pub fn city_token(lat: f64, lon: f64) -> &'static str {
    CITY_AREAS
        .iter()
        .find(|city| city.area.contains(lat, lon))
        .map_or(FALLBACK_CITY_TOKEN, |city| city.token)
}

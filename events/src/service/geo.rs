use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::error;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in km.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lng: f64,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

/// Resolves a postal code or city name via the Nominatim public API.
pub async fn geocode(
    client: &reqwest::Client,
    query: &str,
) -> error::Result<Option<GeocodeResult>> {
    let response = client
        .get("https://nominatim.openstreetmap.org/search")
        .query(&[
            ("q", format!("{} Germany", query)),
            ("format", "json".to_string()),
            ("limit", "1".to_string()),
            ("accept-language", "de".to_string()),
        ])
        .header("User-Agent", "DasPortal/1.0 (kontakt@das-portal.org)")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow::anyhow!("Geocoding request failed with {}", response.status()).into());
    }

    let places: Vec<NominatimPlace> = response.json().await?;
    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };

    Ok(Some(GeocodeResult {
        lat: place.lat.parse()?,
        lng: place.lon.parse()?,
        display_name: place.display_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::haversine_km;

    #[test]
    fn hamburg_to_kiel() {
        // Hamburg (53.55, 9.99) to Kiel (54.32, 10.12) is roughly 86 km.
        let km = haversine_km(53.55, 9.99, 54.32, 10.12);
        assert!((km - 86.0).abs() < 5.0, "got {}", km);
    }

    #[test]
    fn zero_distance() {
        assert!(haversine_km(53.55, 9.99, 53.55, 9.99) < f64::EPSILON);
    }
}

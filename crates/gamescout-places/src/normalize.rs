//! Conversion of places API results into venues suitable for persistence.

use gamescout_core::{GeoPoint, NormalizedVenue, ValidationError};

use crate::types::Place;

/// Display name for a place: the first chain's name when the place belongs
/// to one, otherwise the place's own name.
#[must_use]
pub fn display_name(place: &Place) -> String {
    place
        .chains
        .first()
        .map(|c| c.name.trim())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| place.name.trim())
        .to_string()
}

/// Converts a [`Place`] into a [`NormalizedVenue`] tagged with the category
/// slug and the city whose circle was searched.
///
/// Places without a main geocode cannot be mapped or counted and yield
/// `Ok(None)`.
///
/// # Errors
///
/// Returns [`ValidationError::Record`] if the main geocode is out of range.
pub fn normalize_place(
    place: &Place,
    category: &str,
    search_city: &str,
) -> Result<Option<NormalizedVenue>, ValidationError> {
    let main = place.geocodes.as_ref().and_then(|g| g.main);
    let point = GeoPoint::from_record(
        main.map(|m| m.latitude),
        main.map(|m| m.longitude),
        &place.fsq_id,
    )?;
    let Some(point) = point else {
        tracing::debug!(fsq_id = %place.fsq_id, "place has no main geocode; skipping");
        return Ok(None);
    };

    let address = place
        .location
        .formatted_address
        .clone()
        .or_else(|| place.location.address.clone())
        .filter(|a| !a.trim().is_empty());
    let locality = place
        .location
        .locality
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string);

    Ok(Some(NormalizedVenue {
        fsq_id: place.fsq_id.clone(),
        category: category.to_string(),
        name: display_name(place),
        address,
        locality,
        point,
        search_city: search_city.to_string(),
    }))
}

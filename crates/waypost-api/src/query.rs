use waypost_protocol::EventQuery;

/// Query-string pairs for the map endpoints, in wire order.
///
/// `categories` is repeated once per category; `limit`/`offset` fall back
/// to `default_limit`/0.
pub fn event_query_pairs(query: &EventQuery, default_limit: u32) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("lat", query.lat.to_string()),
        ("lon", query.lon.to_string()),
        ("radius_km", query.radius_km.to_string()),
        ("limit", query.limit.unwrap_or(default_limit).to_string()),
        ("offset", query.offset.unwrap_or(0).to_string()),
    ];
    pairs.extend(
        query
            .categories
            .iter()
            .map(|category| ("categories", category.to_string())),
    );
    pairs
}

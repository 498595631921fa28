use model::{
    geo::{check_radius, Coordinate, InvalidArgument, Locatable},
    WithDistance,
};

/// Distance-annotates `candidates`, drops those without a position or beyond
/// `radius_meters` and sorts the rest by ascending distance.
///
/// The sort is stable: candidates at equal distance keep their input order.
pub fn rank_all<T, I>(
    center: Coordinate,
    candidates: I,
    radius_meters: f64,
) -> Result<Vec<WithDistance<T>>, InvalidArgument>
where
    T: Locatable,
    I: IntoIterator<Item = T>,
{
    let radius_meters = check_radius(radius_meters)?;

    let mut ranked = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = center.distance_to(&candidate.coordinate()?);
            (distance <= radius_meters).then(|| WithDistance::new(distance, candidate))
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

    Ok(ranked)
}

/// Like [`rank_all`], keeping at most `limit` of the nearest candidates.
pub fn rank<T, I>(
    center: Coordinate,
    candidates: I,
    radius_meters: f64,
    limit: usize,
) -> Result<Vec<WithDistance<T>>, InvalidArgument>
where
    T: Locatable,
    I: IntoIterator<Item = T>,
{
    let mut ranked = rank_all(center, candidates, radius_meters)?;
    ranked.truncate(limit);
    Ok(ranked)
}

//! SQL shared by the relational backends. Table and column names come from
//! `CacheKind`, never from input; only values are bound.

use crate::traits::CacheKind;

/// Value columns in bind order, after the key.
pub(crate) fn value_columns(kind: CacheKind) -> Vec<&'static str> {
    let mut columns = vec![kind.data_column()];
    if let Some(polygon) = kind.polygon_column() {
        columns.push(polygon);
    }
    if kind.has_display_polygon() {
        columns.push("display_polygon");
    }
    columns.push("last_updated");
    columns.push("expires_at");
    columns
}

/// `SELECT` list aliased to the uniform row shape. `null_json` is the
/// backend's spelling of a typed JSON null.
pub(crate) fn select_list(kind: CacheKind, null_json: &str) -> String {
    format!(
        "{key} AS cache_key, {data} AS data, {polygon} AS polygon, {display} AS display_polygon, last_updated, expires_at",
        key = kind.key_column(),
        data = kind.data_column(),
        polygon = kind.polygon_column().unwrap_or(null_json),
        display = if kind.has_display_polygon() { "display_polygon" } else { null_json },
    )
}

pub(crate) fn select_live(kind: CacheKind, null_json: &str, placeholder: impl Fn(usize) -> String) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = {} AND expires_at > {}",
        select_list(kind, null_json),
        kind.table(),
        kind.key_column(),
        placeholder(1),
        placeholder(2),
    )
}

pub(crate) fn upsert(kind: CacheKind, placeholder: impl Fn(usize) -> String) -> String {
    let values = value_columns(kind);
    let columns = std::iter::once(kind.key_column())
        .chain(values.iter().copied())
        .collect::<Vec<_>>();
    let placeholders = (1..=columns.len()).map(&placeholder).collect::<Vec<_>>();
    let updates = values
        .iter()
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>();

    format!(
        "INSERT INTO {table} ({columns}) VALUES ({placeholders}) ON CONFLICT ({key}) DO UPDATE SET {updates}",
        table = kind.table(),
        columns = columns.join(", "),
        placeholders = placeholders.join(", "),
        key = kind.key_column(),
        updates = updates.join(", "),
    )
}

pub(crate) fn delete_key(kind: CacheKind, placeholder: impl Fn(usize) -> String) -> String {
    format!("DELETE FROM {} WHERE {} = {}", kind.table(), kind.key_column(), placeholder(1))
}

pub(crate) fn delete_expired(kind: CacheKind, placeholder: impl Fn(usize) -> String) -> String {
    format!("DELETE FROM {} WHERE expires_at <= {}", kind.table(), placeholder(1))
}

pub(crate) fn count(kind: CacheKind) -> String {
    format!("SELECT COUNT(*) FROM {}", kind.table())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dollar(n: usize) -> String {
        format!("${n}")
    }

    #[test]
    fn test_upsert_for_communities_includes_both_geometries() {
        let sql = upsert(CacheKind::Communities, dollar);
        assert_eq!(
            sql,
            "INSERT INTO communities_cache (slug, community_data, polygon, display_polygon, last_updated, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (slug) DO UPDATE SET \
             community_data = excluded.community_data, polygon = excluded.polygon, \
             display_polygon = excluded.display_polygon, last_updated = excluded.last_updated, \
             expires_at = excluded.expires_at"
        );
    }

    #[test]
    fn test_market_stats_select_pads_missing_geometry() {
        let sql = select_live(CacheKind::MarketStats, "NULL", |_| "?".to_string());
        assert!(sql.contains("NULL AS polygon"));
        assert!(sql.contains("NULL AS display_polygon"));
        assert!(sql.ends_with("WHERE area_key = ? AND expires_at > ?"));
    }
}

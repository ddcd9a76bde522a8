//! Bounded partition size.
//!
//! After a write, a partition holding more than its limit drops its oldest
//! entries (lowest sequence first) until exactly `max_entries` remain. The
//! count and the delete run in one transaction, so a re-stored key always
//! carries the highest sequence and is never the one evicted. A `put` queued
//! behind a trim may leave the partition one over its limit until the next
//! trim.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Trim `partition` to `max_entries`, evicting oldest-first.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim(&self, partition: &str, max_entries: usize) -> Result<u64, Error> {
        let name = partition.to_string();
        let deleted = self
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let len: i64 =
                    tx.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![&name], |row| row.get(0))?;
                let excess = (len.max(0) as usize).saturating_sub(max_entries);
                if excess == 0 {
                    return Ok(0);
                }

                let deleted = tx.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND seq IN (
                        SELECT seq FROM entries WHERE partition = ?1 ORDER BY seq ASC LIMIT ?2
                    )",
                    params![&name, excess as i64],
                )?;
                tx.commit()?;
                Ok(deleted as u64)
            })
            .await?;

        if deleted > 0 {
            tracing::debug!(partition, deleted, max_entries, "trimmed partition");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::partitions::{Generation, Partition};
    use crate::classify::Category;
    use crate::config::PartitionLimits;
    use crate::model::{RequestKey, Response};
    use url::Url;

    fn tile_key(i: usize) -> RequestKey {
        RequestKey::new("GET", &Url::parse(&format!("https://tile.openstreetmap.org/10/{i}/0.png")).unwrap())
    }

    fn tiles(max: usize) -> Partition {
        let limits = PartitionLimits { tile_entries: max, ..Default::default() };
        Generation::new("v1", limits).partition(Category::TileOrCdn).unwrap()
    }

    #[tokio::test]
    async fn test_trim_under_limit_is_noop() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let p = tiles(5);
        for i in 0..3 {
            db.put(&p, &tile_key(i), &Response::new(200, "t")).await.unwrap();
        }
        assert_eq!(db.trim(&p.name, p.max_entries).await.unwrap(), 0);
        assert_eq!(db.partition_len(&p.name).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_trim_keeps_newest() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let p = tiles(4);
        for i in 0..10 {
            db.put(&p, &tile_key(i), &Response::new(200, "t")).await.unwrap();
        }

        let deleted = db.trim(&p.name, p.max_entries).await.unwrap();
        assert_eq!(deleted, 6);

        let expected: Vec<RequestKey> = (6..10).map(tile_key).collect();
        assert_eq!(db.list_keys(&p.name).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_trim_after_each_put() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let p = tiles(3);
        for i in 0..7 {
            db.put(&p, &tile_key(i), &Response::new(200, "t")).await.unwrap();
            db.trim(&p.name, p.max_entries).await.unwrap();
            assert!(db.partition_len(&p.name).await.unwrap() <= 3);
        }
        let expected: Vec<RequestKey> = (4..7).map(tile_key).collect();
        assert_eq!(db.list_keys(&p.name).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_trim_racing_restore_keeps_restored_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let p = tiles(2);
        for i in 0..3 {
            db.put(&p, &tile_key(i), &Response::new(200, "t")).await.unwrap();
        }

        let oldest = tile_key(0);
        let fresh = Response::new(200, "fresh");
        let (trimmed, stored) = tokio::join!(db.trim(&p.name, p.max_entries), db.put(&p, &oldest, &fresh));
        trimmed.unwrap();
        stored.unwrap();

        let entry = db.get(&p.name, &tile_key(0)).await.unwrap().unwrap();
        assert_eq!(entry.response.body, b"fresh");
        assert!(db.partition_len(&p.name).await.unwrap() <= 3);

        db.trim(&p.name, p.max_entries).await.unwrap();
        assert_eq!(db.list_keys(&p.name).await.unwrap(), vec![tile_key(2), tile_key(0)]);
    }

    #[tokio::test]
    async fn test_trim_is_per_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let limits = PartitionLimits { static_entries: 1, data_entries: 1, tile_entries: 1 };
        let g = Generation::new("v1", limits);
        let stat = g.partition(Category::Static).unwrap();
        let data = g.partition(Category::Data).unwrap();

        for i in 0..3 {
            db.put(&stat, &tile_key(i), &Response::new(200, "s")).await.unwrap();
            db.put(&data, &tile_key(i), &Response::new(200, "d")).await.unwrap();
        }
        db.trim(&stat.name, stat.max_entries).await.unwrap();

        assert_eq!(db.partition_len(&stat.name).await.unwrap(), 1);
        assert_eq!(db.partition_len(&data.name).await.unwrap(), 3);
    }
}

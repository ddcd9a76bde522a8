//! Partition lifecycle: open, enumerate, delete.
//!
//! A partition is named `{prefix}-{version}`. The current [`Generation`]
//! owns exactly one partition per stored category; every other partition is
//! stale and removed on activation.

use super::connection::CacheDb;
use crate::Error;
use crate::classify::Category;
use crate::config::PartitionLimits;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A named, versioned bucket of cached request/response pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub name: String,
    pub category: Category,
    pub version: String,
    pub max_entries: usize,
}

/// Summary row for inspection tools.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartitionInfo {
    pub name: String,
    pub category: String,
    pub version: String,
    pub max_entries: usize,
    pub entries: usize,
    pub bytes: u64,
    pub created_at: String,
}

/// The set of partitions belonging to one deployed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    version: String,
    limits: PartitionLimits,
}

impl Generation {
    pub fn new(version: impl Into<String>, limits: PartitionLimits) -> Self {
        Self { version: version.into(), limits }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The current partition for a category; `None` for navigation/other.
    pub fn partition(&self, category: Category) -> Option<Partition> {
        let prefix = category.partition_prefix()?;
        let max_entries = self.limits.for_category(category)?;
        Some(Partition { name: format!("{prefix}-{}", self.version), category, version: self.version.clone(), max_entries })
    }

    /// All partitions of this generation.
    pub fn partitions(&self) -> Vec<Partition> {
        Category::STORED.iter().filter_map(|c| self.partition(*c)).collect()
    }

    /// Names retained on activation.
    pub fn keep_set(&self) -> Vec<String> {
        self.partitions().into_iter().map(|p| p.name).collect()
    }
}

impl CacheDb {
    /// Create the partition if absent. Idempotent; an existing partition keeps its entries.
    pub async fn open_partition(&self, partition: &Partition) -> Result<(), Error> {
        let partition = partition.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO partitions (name, category, version, max_entries, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(name) DO UPDATE SET max_entries = excluded.max_entries",
                    params![
                        &partition.name,
                        partition.category.as_str(),
                        &partition.version,
                        partition.max_entries as i64,
                        chrono::Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if no partition had that name.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE partition = ?1", params![&name])?;
                let deleted = tx.execute("DELETE FROM partitions WHERE name = ?1", params![&name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every partition, oldest first.
    pub async fn list_partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a partition by name.
    pub async fn find_partition(&self, name: &str) -> Result<Option<Partition>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Partition>, Error> {
                let result = conn.query_row(
                    "SELECT name, category, version, max_entries FROM partitions WHERE name = ?1",
                    params![name],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    },
                );

                match result {
                    Ok((name, category, version, max_entries)) => {
                        let category = Category::parse(&category)
                            .ok_or_else(|| Error::CorruptEntry(format!("unknown category: {category}")))?;
                        Ok(Some(Partition { name, category, version, max_entries: max_entries.max(0) as usize }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Per-partition statistics, oldest partition first.
    pub async fn partition_infos(&self) -> Result<Vec<PartitionInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PartitionInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT p.name, p.category, p.version, p.max_entries, p.created_at,
                        COUNT(e.key_hash), COALESCE(SUM(LENGTH(e.body)), 0)
                    FROM partitions p
                    LEFT JOIN entries e ON e.partition = p.name
                    GROUP BY p.name
                    ORDER BY p.created_at ASC, p.name ASC",
                )?;
                let infos = stmt
                    .query_map([], |row| {
                        Ok(PartitionInfo {
                            name: row.get(0)?,
                            category: row.get(1)?,
                            version: row.get(2)?,
                            max_entries: row.get::<_, i64>(3)?.max(0) as usize,
                            created_at: row.get(4)?,
                            entries: row.get::<_, i64>(5)?.max(0) as usize,
                            bytes: row.get::<_, i64>(6)?.max(0) as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(infos)
            })
            .await
            .map_err(Error::from)
    }

    /// Version that last completed activation, if any.
    pub async fn active_version(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(|conn| -> Result<Option<String>, Error> {
                match conn.query_row("SELECT active_version FROM generation_meta WHERE id = 1", [], |row| row.get(0)) {
                    Ok(v) => Ok(Some(v)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Record the generation that just became active.
    pub async fn set_active_version(&self, version: &str) -> Result<(), Error> {
        let version = version.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO generation_meta (id, active_version, activated_at) VALUES (1, ?1, ?2)
                    ON CONFLICT(id) DO UPDATE SET
                        active_version = excluded.active_version,
                        activated_at = excluded.activated_at",
                    params![version, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generation(version: &str) -> Generation {
        Generation::new(version, PartitionLimits::default())
    }

    #[test]
    fn test_generation_partition_names() {
        let g = generation("v2");
        assert_eq!(g.keep_set(), vec!["static-v2", "data-v2", "tiles-v2"]);
        assert!(g.partition(Category::Navigation).is_none());
        assert!(g.partition(Category::Other).is_none());
        assert_eq!(g.partition(Category::TileOrCdn).unwrap().max_entries, 400);
    }

    #[tokio::test]
    async fn test_open_partition_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let p = generation("v1").partition(Category::Static).unwrap();

        db.open_partition(&p).await.unwrap();
        db.open_partition(&p).await.unwrap();

        assert_eq!(db.list_partition_names().await.unwrap(), vec!["static-v1"]);
        assert_eq!(db.find_partition("static-v1").await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn test_delete_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for p in generation("v1").partitions() {
            db.open_partition(&p).await.unwrap();
        }

        assert!(db.delete_partition("data-v1").await.unwrap());
        assert!(!db.delete_partition("data-v1").await.unwrap());

        let mut names = db.list_partition_names().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["static-v1", "tiles-v1"]);
    }

    #[tokio::test]
    async fn test_find_missing_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.find_partition("static-v9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partition_infos_empty() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition(&generation("v1").partition(Category::Data).unwrap())
            .await
            .unwrap();

        let infos = db.partition_infos().await.unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "data-v1");
        assert_eq!(infos[0].category, "data");
        assert_eq!(infos[0].entries, 0);
        assert_eq!(infos[0].bytes, 0);
    }

    #[tokio::test]
    async fn test_active_version() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert_eq!(db.active_version().await.unwrap(), None);

        db.set_active_version("v1").await.unwrap();
        db.set_active_version("v2").await.unwrap();
        assert_eq!(db.active_version().await.unwrap(), Some("v2".to_string()));
    }
}

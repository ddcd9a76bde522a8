//! Cache entry reads and writes.
//!
//! Entries are replaced wholesale. Every `put` takes the next value of a
//! global sequence, so a re-fetched key becomes the newest entry of its
//! partition.

use super::connection::CacheDb;
use super::partitions::Partition;
use crate::Error;
use crate::model::{RequestKey, Response, ResponseType};
use tokio_rusqlite::{params, rusqlite};

/// A stored (request key, response snapshot) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub seq: i64,
    pub response: Response,
    pub stored_at: String,
}

impl CacheDb {
    /// Store a response under `key`, creating the partition if needed.
    pub async fn put(&self, partition: &Partition, key: &RequestKey, response: &Response) -> Result<(), Error> {
        let partition = partition.clone();
        let key_hash = key.hash();
        let method = key.method().to_string();
        let url = key.url().to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let response = response.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, category, version, max_entries, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        &partition.name,
                        partition.category.as_str(),
                        &partition.version,
                        partition.max_entries as i64,
                        &stored_at,
                    ],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                    partition, key_hash, method, url, seq,
                    status, status_text, response_type, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(seq), 0) + 1 FROM entries),
                          ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(partition, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    seq = excluded.seq,
                    status = excluded.status,
                    status_text = excluded.status_text,
                    response_type = excluded.response_type,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &partition.name,
                        &key_hash,
                        &method,
                        &url,
                        response.status as i64,
                        &response.status_text,
                        response.response_type.as_str(),
                        &headers_json,
                        &response.body,
                        &stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the entry for `key` in the named partition.
    ///
    /// Returns None if the partition or the key doesn't exist.
    pub async fn get(&self, partition: &str, key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        let partition = partition.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, seq, status, status_text,
                        response_type, headers_json, body, stored_at
                    FROM entries WHERE partition = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![partition, key_hash], |row| {
                    Ok(RawEntry {
                        key_hash: row.get(0)?,
                        method: row.get(1)?,
                        url: row.get(2)?,
                        seq: row.get(3)?,
                        status: row.get(4)?,
                        status_text: row.get(5)?,
                        response_type: row.get(6)?,
                        headers_json: row.get(7)?,
                        body: row.get(8)?,
                        stored_at: row.get(9)?,
                    })
                });

                match result {
                    Ok(raw) => raw.decode().map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Keys of the named partition in insertion order, oldest first.
    pub async fn list_keys(&self, partition: &str) -> Result<Vec<RequestKey>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE partition = ?1 ORDER BY seq ASC")?;
                let keys = stmt
                    .query_map(params![partition], |row| {
                        Ok(RequestKey::from_parts(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the given keys from a partition. Returns the number removed.
    pub async fn delete_entries(&self, partition: &str, keys: &[RequestKey]) -> Result<u64, Error> {
        let partition = partition.to_string();
        let hashes: Vec<String> = keys.iter().map(RequestKey::hash).collect();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut deleted = 0u64;
                {
                    let mut stmt = tx.prepare("DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2")?;
                    for hash in &hashes {
                        deleted += stmt.execute(params![&partition, hash])? as u64;
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a partition.
    pub async fn partition_len(&self, partition: &str) -> Result<usize, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count.max(0) as usize)
            })
            .await
            .map_err(Error::from)
    }

    /// Linear scan of every partition for `key`; the first match wins.
    pub async fn match_any(&self, key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        for name in self.list_partition_names().await? {
            if let Some(entry) = self.get(&name, key).await? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

/// Row shape before decoding headers and response type.
struct RawEntry {
    key_hash: String,
    method: String,
    url: String,
    seq: i64,
    status: i64,
    status_text: String,
    response_type: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl RawEntry {
    fn decode(self) -> Result<CacheEntry, Error> {
        let response_type = ResponseType::parse(&self.response_type)
            .ok_or_else(|| Error::CorruptEntry(format!("unknown response type: {}", self.response_type)))?;
        let status = u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status {}", self.status)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;

        Ok(CacheEntry {
            key_hash: self.key_hash,
            method: self.method,
            url: self.url,
            seq: self.seq,
            response: Response { status, status_text: self.status_text, headers, body: self.body, response_type },
            stored_at: self.stored_at,
        })
    }
}

//! SQLite implementation of [`CacheStore`].

use super::connection::CacheDb;
use super::store::{CacheEntry, CacheStore, EntryMeta};
use crate::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc))
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open_partition(&self, partition: &str) -> Result<(), Error> {
        let partition = partition.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![partition, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE partition = ?1", params![partition])?;
                let removed = tx.execute("DELETE FROM partitions WHERE name = ?1", params![partition])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, partition: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, method, url, status, headers_json, body, captured_at, size_bytes
                     FROM entries WHERE partition = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![partition, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, i64>(7)?,
                    ))
                });

                let (key, method, url, status, headers_json, body, captured_at, size_bytes) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status}")))?;

                Ok(Some(CacheEntry {
                    key,
                    method,
                    url,
                    status,
                    headers: serde_json::from_str(&headers_json)?,
                    body,
                    captured_at: parse_timestamp(captured_at),
                    size_bytes: size_bytes.max(0) as u64,
                }))
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, partition: &str, entry: &CacheEntry) -> Result<(), Error> {
        let partition = partition.to_string();
        let entry = entry.clone();
        let headers_json = serde_json::to_string(&entry.headers)?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![partition, now],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                        partition, key, method, url, status, headers_json, body, captured_at, size_bytes
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(partition, key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        captured_at = excluded.captured_at,
                        size_bytes = excluded.size_bytes",
                    params![
                        &partition,
                        &entry.key,
                        &entry.method,
                        &entry.url,
                        entry.status as i64,
                        &headers_json,
                        &entry.body,
                        entry.captured_at.map(|t| t.to_rfc3339()),
                        entry.size_bytes as i64,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key = ?2",
                    params![partition, key],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_entries(&self, partition: &str) -> Result<Vec<EntryMeta>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, url, captured_at, size_bytes FROM entries
                     WHERE partition = ?1 ORDER BY captured_at ASC, key ASC",
                )?;
                let rows = stmt
                    .query_map(params![partition], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(rows
                    .into_iter()
                    .map(|(key, url, captured_at, size_bytes)| EntryMeta {
                        key,
                        url,
                        captured_at: parse_timestamp(captured_at),
                        size_bytes: size_bytes.max(0) as u64,
                    })
                    .collect())
            })
            .await
            .map_err(Error::from)
    }
}

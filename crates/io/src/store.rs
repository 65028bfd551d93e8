// SQLite implementation of the engine's rate store.
//
// Rates are unique on (scope kind, scope id, normalized name); the
// normalized form is computed in Rust and stored alongside the display
// name, because SQLite's NOCASE collation is ASCII-only and the names
// are Cyrillic.

use std::path::Path;

use rusqlite::{params, Connection};
use smeta_core::{normalize_name, RateScope};
use smeta_recon::error::StoreError;
use smeta_recon::import::RateStore;
use smeta_recon::model::{RateCandidate, RateRecord};

use crate::error::IoError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS rates (
    id INTEGER PRIMARY KEY,
    scope_kind TEXT NOT NULL,      -- 'object' or 'counterparty'
    scope_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    name_norm TEXT NOT NULL,
    unit TEXT NOT NULL,
    price REAL NOT NULL,
    UNIQUE (scope_kind, scope_id, name_norm)
);
"#;

pub struct SqliteRateStore {
    conn: Connection,
}

impl SqliteRateStore {
    pub fn open(path: &Path) -> Result<Self, IoError> {
        let conn = Connection::open(path).map_err(|e| IoError::Db(e.to_string()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, IoError> {
        let conn = Connection::open_in_memory().map_err(|e| IoError::Db(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, IoError> {
        conn.execute_batch(SCHEMA).map_err(|e| IoError::Db(e.to_string()))?;
        Ok(Self { conn })
    }

    /// All rates within one scope, for listing/export.
    pub fn list(&self, scope: RateScope) -> Result<Vec<RateRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, unit, price FROM rates
                 WHERE scope_kind = ?1 AND scope_id = ?2 ORDER BY name_norm",
            )
            .map_err(|e| StoreError::Lookup(e.to_string()))?;
        let rows = stmt
            .query_map(params![scope.kind(), scope.id()], |row| {
                Ok(RateRecord {
                    id: row.get(0)?,
                    scope,
                    name: row.get(1)?,
                    unit: row.get(2)?,
                    price: row.get(3)?,
                })
            })
            .map_err(|e| StoreError::Lookup(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Lookup(e.to_string()))
    }
}

/// True for SQLITE_CONSTRAINT_UNIQUE / _PRIMARYKEY failures.
fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl RateStore for SqliteRateStore {
    fn find(&self, scope: RateScope, name_norm: &str) -> Result<Option<RateRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, unit, price FROM rates
                 WHERE scope_kind = ?1 AND scope_id = ?2 AND name_norm = ?3",
            )
            .map_err(|e| StoreError::Lookup(e.to_string()))?;
        let mut rows = stmt
            .query_map(params![scope.kind(), scope.id(), name_norm], |row| {
                Ok(RateRecord {
                    id: row.get(0)?,
                    scope,
                    name: row.get(1)?,
                    unit: row.get(2)?,
                    price: row.get(3)?,
                })
            })
            .map_err(|e| StoreError::Lookup(e.to_string()))?;
        match rows.next() {
            None => Ok(None),
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(StoreError::Lookup(e.to_string())),
        }
    }

    fn insert(&mut self, scope: RateScope, candidate: &RateCandidate) -> Result<i64, StoreError> {
        self.conn
            .execute(
                "INSERT INTO rates (scope_kind, scope_id, name, name_norm, unit, price)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    scope.kind(),
                    scope.id(),
                    candidate.name,
                    normalize_name(&candidate.name),
                    candidate.unit,
                    candidate.price
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::UniqueConstraint(candidate.name.clone())
                } else {
                    StoreError::Write(e.to_string())
                }
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_price(&mut self, id: i64, price: f64) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("UPDATE rates SET price = ?1 WHERE id = ?2", params![price, id])
            .map_err(|e| StoreError::Write(e.to_string()))?;
        if changed == 0 {
            return Err(StoreError::Write(format!("no rate with id {id}")));
        }
        Ok(())
    }

    fn delete(&mut self, ids: &[i64]) -> Result<usize, StoreError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| StoreError::Write(e.to_string()))?;
        let mut deleted = 0usize;
        for id in ids {
            deleted += tx
                .execute("DELETE FROM rates WHERE id = ?1", params![id])
                .map_err(|e| StoreError::Write(e.to_string()))?;
        }
        tx.commit().map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, price: f64) -> RateCandidate {
        RateCandidate { name: name.into(), unit: "м".into(), price }
    }

    #[test]
    fn insert_find_roundtrip_is_case_insensitive() {
        let mut store = SqliteRateStore::open_in_memory().unwrap();
        store.insert(RateScope::Object(3), &candidate("Кабель ВВГ", 98.4)).unwrap();

        let found = store
            .find(RateScope::Object(3), &normalize_name("  КАБЕЛЬ ввг "))
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "Кабель ВВГ");
        assert_eq!(found.price, 98.4);
    }

    #[test]
    fn unique_violation_is_distinct() {
        let mut store = SqliteRateStore::open_in_memory().unwrap();
        store.insert(RateScope::Object(3), &candidate("Кабель", 1.0)).unwrap();
        let err = store
            .insert(RateScope::Object(3), &candidate("кабель ", 2.0))
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueConstraint(_)));
    }

    #[test]
    fn scopes_are_separate_tables_logically() {
        let mut store = SqliteRateStore::open_in_memory().unwrap();
        store.insert(RateScope::Object(3), &candidate("Кабель", 1.0)).unwrap();
        store.insert(RateScope::Counterparty(3), &candidate("Кабель", 2.0)).unwrap();

        let object_rate = store.find(RateScope::Object(3), "кабель").unwrap().unwrap();
        let contractor_rate = store
            .find(RateScope::Counterparty(3), "кабель")
            .unwrap()
            .unwrap();
        assert_eq!(object_rate.price, 1.0);
        assert_eq!(contractor_rate.price, 2.0);
    }

    #[test]
    fn update_and_delete() {
        let mut store = SqliteRateStore::open_in_memory().unwrap();
        let id = store.insert(RateScope::Object(1), &candidate("Кабель", 1.0)).unwrap();
        store.update_price(id, 5.0).unwrap();
        assert_eq!(store.find(RateScope::Object(1), "кабель").unwrap().unwrap().price, 5.0);

        assert_eq!(store.delete(&[id]).unwrap(), 1);
        assert!(store.find(RateScope::Object(1), "кабель").unwrap().is_none());

        let err = store.update_price(id, 9.0).unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
    }

    #[test]
    fn list_orders_by_normalized_name() {
        let mut store = SqliteRateStore::open_in_memory().unwrap();
        store.insert(RateScope::Object(1), &candidate("Цемент", 1.0)).unwrap();
        store.insert(RateScope::Object(1), &candidate("Арматура", 2.0)).unwrap();
        let all = store.list(RateScope::Object(1)).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Арматура");
    }
}

//! Key/value settings read by the cycle gate.

use rusqlite::params;

use super::OpsDb;

impl OpsDb {
    /// Read one settings value, `None` when the key is absent.
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, String> {
        let mut stmt = self
            .conn_ref()
            .prepare("SELECT value FROM ops_settings WHERE key = ?1")
            .map_err(|e| format!("Failed to prepare settings query: {}", e))?;
        let mut rows = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .map_err(|e| format!("Failed to query setting {}: {}", key, e))?;
        match rows.next() {
            Some(row) => Ok(Some(
                row.map_err(|e| format!("Failed to read setting {}: {}", key, e))?,
            )),
            None => Ok(None),
        }
    }

    /// Write (or overwrite) one settings value.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), String> {
        self.conn_ref()
            .execute(
                "INSERT INTO ops_settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(|e| format!("Failed to set setting {}: {}", key, e))?;
        Ok(())
    }
}

use rusqlite::{Connection, Result as SqliteResult, params};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

pub struct ReceiptStore {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredReceipt {
    pub id: Option<i64>,
    pub fingerprint: String,
    pub merchant: String,
    pub total_amount: f64,
    pub points_awarded: i64,
    pub raw_ocr_text: String,
    pub confidence: f64,
    pub processed_at: Option<String>,
}

/// What happened to a receipt handed to [`ReceiptStore::record_receipt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded { receipt_id: i64 },
    /// Same merchant and total already stored inside the window; nothing written.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointsTransaction {
    pub id: Option<i64>,
    /// "earned" for receipt rewards.
    pub transaction_type: String,
    pub amount: i64,
    pub receipt_id: Option<i64>,
}

impl ReceiptStore {
    /// Open (or create) the receipt store at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        Self::init(Connection::open(db_path)?)
    }

    /// Throwaway store, used by tests and dry runs.
    pub fn open_in_memory() -> SqliteResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> SqliteResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS receipts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fingerprint TEXT NOT NULL,
                merchant TEXT NOT NULL,
                total_amount REAL NOT NULL,
                points_awarded INTEGER NOT NULL DEFAULT 25,
                raw_ocr_text TEXT,
                confidence REAL,
                processed_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS points_ledger (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                transaction_type TEXT NOT NULL DEFAULT 'earned',
                amount INTEGER NOT NULL,
                receipt_id INTEGER,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (receipt_id) REFERENCES receipts(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_receipts_fingerprint ON receipts(fingerprint)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_receipts_processed_at ON receipts(processed_at)",
            [],
        )?;

        info!("Receipt store initialized");
        Ok(Self { conn })
    }

    /// Stable identity for a (merchant, total) pair.
    pub fn fingerprint(merchant: &str, total: f64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(merchant.trim().to_lowercase().as_bytes());
        hasher.update(format!("{total:.2}").as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// True if the same merchant and total were stored within the last `window_minutes`.
    pub fn check_duplicate(
        &self,
        merchant: &str,
        total: f64,
        window_minutes: i64,
    ) -> SqliteResult<bool> {
        let window = format!("-{} minutes", window_minutes.max(0));
        let mut stmt = self.conn.prepare(
            "SELECT 1 FROM receipts
             WHERE fingerprint = ?1
               AND processed_at > datetime('now', ?2)
             LIMIT 1",
        )?;
        stmt.exists(params![Self::fingerprint(merchant, total), window])
    }

    /// Store a receipt and its `earned` ledger entry atomically, unless the
    /// same receipt was already stored within `window_minutes`.
    pub fn record_receipt(
        &self,
        receipt: &StoredReceipt,
        window_minutes: i64,
    ) -> SqliteResult<RecordOutcome> {
        let tx = self.conn.unchecked_transaction()?;

        if self.check_duplicate(&receipt.merchant, receipt.total_amount, window_minutes)? {
            return Ok(RecordOutcome::Duplicate);
        }

        let receipt_id = self.insert_receipt(receipt)?;
        self.insert_points_transaction(&PointsTransaction {
            id: None,
            transaction_type: "earned".to_string(),
            amount: receipt.points_awarded,
            receipt_id: Some(receipt_id),
        })?;

        tx.commit()?;
        Ok(RecordOutcome::Recorded { receipt_id })
    }

    /// Insert a receipt and return its new id.
    pub fn insert_receipt(&self, receipt: &StoredReceipt) -> SqliteResult<i64> {
        self.conn.execute(
            "INSERT INTO receipts
                (fingerprint, merchant, total_amount, points_awarded, raw_ocr_text, confidence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                receipt.fingerprint,
                receipt.merchant,
                receipt.total_amount,
                receipt.points_awarded,
                receipt.raw_ocr_text,
                receipt.confidence,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(receipt_id = id, merchant = %receipt.merchant, total = receipt.total_amount, "Receipt stored");
        Ok(id)
    }

    pub fn insert_points_transaction(&self, tx: &PointsTransaction) -> SqliteResult<i64> {
        self.conn.execute(
            "INSERT INTO points_ledger (transaction_type, amount, receipt_id)
             VALUES (?1, ?2, ?3)",
            params![tx.transaction_type, tx.amount, tx.receipt_id],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(
            ledger_id = id,
            kind = %tx.transaction_type,
            amount = tx.amount,
            "Points transaction recorded"
        );
        Ok(id)
    }

    /// Every stored receipt, newest first.
    pub fn get_all_receipts(&self) -> SqliteResult<Vec<StoredReceipt>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, fingerprint, merchant, total_amount, points_awarded, raw_ocr_text, confidence, processed_at
             FROM receipts
             ORDER BY processed_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| Self::row_to_receipt(row))?;
        rows.collect()
    }

    pub fn get_receipt_by_id(&self, id: i64) -> SqliteResult<Option<StoredReceipt>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, fingerprint, merchant, total_amount, points_awarded, raw_ocr_text, confidence, processed_at
             FROM receipts
             WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_receipt(row)?)),
            None => Ok(None),
        }
    }

    /// Current points balance.
    pub fn get_total_points(&self) -> SqliteResult<i64> {
        self.conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM points_ledger",
            [],
            |row| row.get(0),
        )
    }

    fn row_to_receipt(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredReceipt> {
        Ok(StoredReceipt {
            id: Some(row.get(0)?),
            fingerprint: row.get(1)?,
            merchant: row.get(2)?,
            total_amount: row.get(3)?,
            points_awarded: row.get(4)?,
            raw_ocr_text: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            confidence: row.get::<_, Option<f64>>(6)?.unwrap_or_default(),
            processed_at: row.get(7)?,
        })
    }

    #[cfg(test)]
    fn backdate_receipt(&self, id: i64, minutes: i64) -> SqliteResult<()> {
        self.conn.execute(
            "UPDATE receipts SET processed_at = datetime('now', ?1) WHERE id = ?2",
            params![format!("-{minutes} minutes"), id],
        )?;
        Ok(())
    }

    /// Make every ledger write fail until [`Self::restore_points_ledger`].
    #[cfg(test)]
    pub(crate) fn break_points_ledger(&self) -> SqliteResult<()> {
        self.conn
            .execute_batch("ALTER TABLE points_ledger RENAME TO points_ledger_offline")
    }

    #[cfg(test)]
    pub(crate) fn restore_points_ledger(&self) -> SqliteResult<()> {
        self.conn
            .execute_batch("ALTER TABLE points_ledger_offline RENAME TO points_ledger")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(merchant: &str, total: f64) -> StoredReceipt {
        StoredReceipt {
            id: None,
            fingerprint: ReceiptStore::fingerprint(merchant, total),
            merchant: merchant.to_string(),
            total_amount: total,
            points_awarded: 25,
            raw_ocr_text: format!("{merchant}\nTotal ${total:.2}"),
            confidence: 91.4,
            processed_at: None,
        }
    }

    #[test]
    fn test_fingerprint_normalizes_merchant_and_amount() {
        assert_eq!(
            ReceiptStore::fingerprint("Corner Market", 4.5),
            ReceiptStore::fingerprint("  CORNER MARKET ", 4.50)
        );
        assert_ne!(
            ReceiptStore::fingerprint("Corner Market", 4.5),
            ReceiptStore::fingerprint("Corner Market", 4.51)
        );
    }

    #[test]
    fn test_insert_and_read_back() {
        let db = ReceiptStore::open_in_memory().unwrap();
        let id = db.insert_receipt(&receipt("STARBUCKS COFFEE", 5.47)).unwrap();

        let stored = db.get_receipt_by_id(id).unwrap().unwrap();
        assert_eq!(stored.merchant, "STARBUCKS COFFEE");
        assert_eq!(stored.total_amount, 5.47);
        assert_eq!(stored.confidence, 91.4);
        assert!(stored.processed_at.is_some());

        assert!(db.get_receipt_by_id(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_receipts_listed_newest_first() {
        let db = ReceiptStore::open_in_memory().unwrap();
        let older = db.insert_receipt(&receipt("FIRST STOP", 1.0)).unwrap();
        let newer = db.insert_receipt(&receipt("SECOND STOP", 2.0)).unwrap();
        db.backdate_receipt(older, 5).unwrap();

        let ids: Vec<i64> = db
            .get_all_receipts()
            .unwrap()
            .into_iter()
            .filter_map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![newer, older]);
    }

    #[test]
    fn test_points_balance() {
        let db = ReceiptStore::open_in_memory().unwrap();
        assert_eq!(db.get_total_points().unwrap(), 0);

        let id = db.insert_receipt(&receipt("TACO TRUCK", 9.99)).unwrap();
        for _ in 0..2 {
            db.insert_points_transaction(&PointsTransaction {
                id: None,
                transaction_type: "earned".to_string(),
                amount: 25,
                receipt_id: Some(id),
            })
            .unwrap();
        }
        assert_eq!(db.get_total_points().unwrap(), 50);
    }

    #[test]
    fn test_duplicate_window() {
        let db = ReceiptStore::open_in_memory().unwrap();
        let id = db.insert_receipt(&receipt("Joe's Pizza Inc.", 13.0)).unwrap();

        assert!(db.check_duplicate("Joe's Pizza Inc.", 13.0, 60).unwrap());
        assert!(db.check_duplicate("joe's pizza inc.", 13.00, 60).unwrap());
        assert!(!db.check_duplicate("Joe's Pizza Inc.", 14.0, 60).unwrap());

        db.backdate_receipt(id, 90).unwrap();
        assert!(!db.check_duplicate("Joe's Pizza Inc.", 13.0, 60).unwrap());
        assert!(db.check_duplicate("Joe's Pizza Inc.", 13.0, 120).unwrap());
    }

    #[test]
    fn test_record_receipt_writes_receipt_and_points() {
        let db = ReceiptStore::open_in_memory().unwrap();
        let outcome = db.record_receipt(&receipt("CORNER MARKET", 4.5), 60).unwrap();
        let RecordOutcome::Recorded { receipt_id } = outcome else {
            panic!("expected a new receipt, got {outcome:?}");
        };
        assert!(db.get_receipt_by_id(receipt_id).unwrap().is_some());
        assert_eq!(db.get_total_points().unwrap(), 25);

        let again = db.record_receipt(&receipt("CORNER MARKET", 4.5), 60).unwrap();
        assert_eq!(again, RecordOutcome::Duplicate);
        assert_eq!(db.get_all_receipts().unwrap().len(), 1);
        assert_eq!(db.get_total_points().unwrap(), 25);
    }

    #[test]
    fn test_failed_ledger_write_rolls_back_receipt() {
        let db = ReceiptStore::open_in_memory().unwrap();
        db.break_points_ledger().unwrap();

        assert!(db.record_receipt(&receipt("CORNER MARKET", 4.5), 60).is_err());

        db.restore_points_ledger().unwrap();
        assert!(db.get_all_receipts().unwrap().is_empty());
        assert_eq!(db.get_total_points().unwrap(), 0);
        assert!(!db.check_duplicate("CORNER MARKET", 4.5, 60).unwrap());

        let retry = db.record_receipt(&receipt("CORNER MARKET", 4.5), 60).unwrap();
        assert!(matches!(retry, RecordOutcome::Recorded { .. }));
        assert_eq!(db.get_total_points().unwrap(), 25);
    }

    #[test]
    fn test_negative_window_is_treated_as_zero() {
        let db = ReceiptStore::open_in_memory().unwrap();
        let id = db.insert_receipt(&receipt("TACO TRUCK", 9.99)).unwrap();
        db.backdate_receipt(id, 1).unwrap();

        assert!(!db.check_duplicate("TACO TRUCK", 9.99, -5).unwrap());
        assert!(db.check_duplicate("TACO TRUCK", 9.99, 5).unwrap());
    }
}

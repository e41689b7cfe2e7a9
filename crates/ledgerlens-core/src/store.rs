//! Receipt storage and expense persistence seams, with in-memory implementations.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("receipt storage failed: {0}")]
    Storage(String),

    #[error("expense persistence failed: {0}")]
    Persistence(String),
}

/// Expense record handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub date: String,
    pub cost: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub vendor: String,
    pub location: String,
    pub trip_name: Option<String>,
    pub comments: Option<String>,
    pub receipt_path: String,
}

pub trait ReceiptStorage: Send + Sync {
    /// Store the uploaded bytes and return the path the receipt can be found under.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] when the bytes cannot be stored.
    fn put(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<String, StoreError>> + Send;
}

pub trait ExpenseStore: Send + Sync {
    /// Persist one expense and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the record cannot be written.
    fn create_expense(
        &self,
        expense: &NewExpense,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;
}

#[derive(Debug, Default)]
pub struct InMemoryReceiptStorage {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl InMemoryReceiptStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored receipt paths in insertion order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|files| files.iter().map(|(path, _)| path.clone()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        let files = self.files.lock().ok()?;
        files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, bytes)| bytes.clone())
    }
}

impl ReceiptStorage for InMemoryReceiptStorage {
    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| StoreError::Storage("receipt store lock poisoned".into()))?;
        let path = format!("receipts/{}-{}", files.len() + 1, sanitize(filename));
        files.push((path.clone(), bytes.to_vec()));
        Ok(path)
    }
}

/// Keep the final path component and replace anything outside `[A-Za-z0-9._-]`.
fn sanitize(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "receipt".into()
    } else {
        cleaned
    }
}

#[derive(Debug)]
pub struct InMemoryExpenseStore {
    expenses: Mutex<Vec<(i64, NewExpense)>>,
    next_id: AtomicI64,
}

impl Default for InMemoryExpenseStore {
    fn default() -> Self {
        Self {
            expenses: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryExpenseStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn expenses(&self) -> Vec<(i64, NewExpense)> {
        self.expenses
            .lock()
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.expenses.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExpenseStore for InMemoryExpenseStore {
    async fn create_expense(&self, expense: &NewExpense) -> Result<i64, StoreError> {
        let mut rows = self
            .expenses
            .lock()
            .map_err(|_| StoreError::Persistence("expense store lock poisoned".into()))?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        rows.push((id, expense.clone()));
        Ok(id)
    }
}

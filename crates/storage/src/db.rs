use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tally_core::{CategoryId, DateWindow, Money, Transaction, TransactionId};
use thiserror::Error;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Amount does not fit in cents for transaction {0}")]
    AmountOutOfRange(TransactionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;
    tracing::debug!("database ready at {}", path.display());

    Ok(pool)
}

/// Single-connection in-memory database; the connection is never recycled
/// so the data lives as long as the pool.
pub async fn create_memory_db() -> Result<DbPool, StorageError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            description TEXT NOT NULL,
            particulars TEXT,
            code TEXT,
            reference TEXT,
            amount_cents INTEGER NOT NULL,
            date TEXT NOT NULL,
            balance_cents INTEGER NOT NULL,
            account TEXT NOT NULL,
            category TEXT,
            imported_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions (category)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions (date)")
        .execute(pool)
        .await?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: String,
    description: String,
    particulars: Option<String>,
    code: Option<String>,
    reference: Option<String>,
    amount_cents: i64,
    date: NaiveDate,
    balance_cents: i64,
    account: String,
    category: Option<String>,
}

impl From<TransactionRow> for Transaction {
    fn from(r: TransactionRow) -> Self {
        Transaction {
            id: TransactionId(r.id),
            description: r.description,
            particulars: r.particulars,
            code: r.code,
            reference: r.reference,
            amount: Money::from_cents(r.amount_cents),
            date: r.date,
            balance: Money::from_cents(r.balance_cents),
            account: r.account,
            category: r.category.map(CategoryId),
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, description, particulars, code, reference, amount_cents, date, balance_cents, account, category FROM transactions";

fn cents(tx: &Transaction, amount: Money) -> Result<i64, StorageError> {
    amount
        .to_cents()
        .ok_or_else(|| StorageError::AmountOutOfRange(tx.id.clone()))
}

/// Inserts a new statement line, or fills in structured fields on an
/// existing one. Amount, date, balance and category of an existing row are
/// never touched, and a present field is never replaced by an empty one.
pub async fn upsert_transaction(pool: &DbPool, tx: &Transaction) -> Result<UpsertOutcome, StorageError> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE id = ?")
        .bind(tx.id.as_str())
        .fetch_one(pool)
        .await?
        > 0;

    if exists {
        sqlx::query(
            r#"
            UPDATE transactions
            SET particulars = COALESCE(?, particulars),
                code = COALESCE(?, code),
                reference = COALESCE(?, reference)
            WHERE id = ?
            "#,
        )
        .bind(tx.particulars.as_deref())
        .bind(tx.code.as_deref())
        .bind(tx.reference.as_deref())
        .bind(tx.id.as_str())
        .execute(pool)
        .await?;
        return Ok(UpsertOutcome::Updated);
    }

    sqlx::query(
        "INSERT INTO transactions (id, description, particulars, code, reference, amount_cents, date, balance_cents, account, category) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(tx.id.as_str())
    .bind(&tx.description)
    .bind(tx.particulars.as_deref())
    .bind(tx.code.as_deref())
    .bind(tx.reference.as_deref())
    .bind(cents(tx, tx.amount)?)
    .bind(tx.date)
    .bind(cents(tx, tx.balance)?)
    .bind(&tx.account)
    .bind(tx.category.as_ref().map(CategoryId::as_str))
    .execute(pool)
    .await?;

    Ok(UpsertOutcome::Inserted)
}

/// Everything with a category, optionally leaving out one category.
/// Ordered by date, then insertion order.
pub async fn get_categorized(
    pool: &DbPool,
    excluded: Option<&CategoryId>,
) -> Result<Vec<Transaction>, StorageError> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "{SELECT_COLUMNS} WHERE category IS NOT NULL AND category IS NOT ? ORDER BY date, rowid"
    ))
    .bind(excluded.map(CategoryId::as_str))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Transaction::from).collect())
}

/// Rows still awaiting a category, plus those filed under `category_override`.
pub async fn get_uncategorized(
    pool: &DbPool,
    category_override: Option<&CategoryId>,
) -> Result<Vec<Transaction>, StorageError> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "{SELECT_COLUMNS} WHERE category IS NULL OR category = ? ORDER BY date, rowid"
    ))
    .bind(category_override.map(CategoryId::as_str))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Transaction::from).collect())
}

pub async fn update_category(
    pool: &DbPool,
    id: &TransactionId,
    category: &CategoryId,
) -> Result<bool, StorageError> {
    let result = sqlx::query("UPDATE transactions SET category = ? WHERE id = ?")
        .bind(category.as_str())
        .bind(id.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn category_usage(pool: &DbPool) -> Result<HashMap<CategoryId, u64>, StorageError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT category, COUNT(*) FROM transactions WHERE category IS NOT NULL GROUP BY category",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(category, count)| (CategoryId(category), count.max(0) as u64))
        .collect())
}

pub async fn list_accounts(pool: &DbPool) -> Result<Vec<String>, StorageError> {
    let accounts = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT account FROM transactions WHERE account != '' ORDER BY account",
    )
    .fetch_all(pool)
    .await?;
    Ok(accounts)
}

/// Largest transactions by magnitude within `categories` and `window`.
pub async fn top_transactions(
    pool: &DbPool,
    categories: &[CategoryId],
    window: &DateWindow,
    limit: u32,
) -> Result<Vec<Transaction>, StorageError> {
    if categories.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    query.push(" WHERE category IN (");
    let mut ids = query.separated(", ");
    for id in categories {
        ids.push_bind(id.as_str());
    }
    ids.push_unseparated(")");
    if let Some(from) = window.from {
        query.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = window.to {
        query.push(" AND date <= ").push_bind(to);
    }
    query
        .push(" ORDER BY ABS(amount_cents) DESC, date LIMIT ")
        .push_bind(i64::from(limit));

    let rows = query
        .build_query_as::<TransactionRow>()
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Transaction::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::NewTransaction;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(description: &str, cents: i64, on: NaiveDate) -> NewTransaction {
        NewTransaction {
            description: description.to_string(),
            amount: Money::from_cents(cents),
            date: on,
            balance: Money::from_cents(50000),
            account: "Everyday".to_string(),
            ..NewTransaction::default()
        }
    }

    fn categorized(new: NewTransaction, category: &str) -> Transaction {
        let mut tx = new.into_transaction();
        tx.category = Some(CategoryId::new(category));
        tx
    }

    async fn all(pool: &DbPool) -> Vec<Transaction> {
        sqlx::query_as::<_, TransactionRow>(&format!("{SELECT_COLUMNS} ORDER BY rowid"))
            .fetch_all(pool)
            .await
            .unwrap()
            .into_iter()
            .map(Transaction::from)
            .collect()
    }

    #[tokio::test]
    async fn insert_then_read_back() {
        let pool = create_memory_db().await.unwrap();
        let tx = NewTransaction {
            particulars: Some("ACME".into()),
            ..row("SALARY", 200000, date(2024, 2, 5))
        }
        .into_transaction();
        assert_eq!(upsert_transaction(&pool, &tx).await.unwrap(), UpsertOutcome::Inserted);
        assert_eq!(all(&pool).await, vec![tx]);
    }

    #[tokio::test]
    async fn reimport_is_idempotent_and_fills_blank_fields() {
        let pool = create_memory_db().await.unwrap();
        let first = NewTransaction {
            particulars: Some("FLAT".into()),
            ..row("RENT", -50000, date(2024, 2, 1))
        }
        .into_transaction();
        upsert_transaction(&pool, &first).await.unwrap();

        let again = NewTransaction {
            particulars: None,
            code: Some("7".into()),
            reference: Some("FEB".into()),
            ..row("RENT", -50000, date(2024, 2, 1))
        }
        .into_transaction();
        assert_eq!(upsert_transaction(&pool, &again).await.unwrap(), UpsertOutcome::Updated);

        let stored = all(&pool).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].particulars.as_deref(), Some("FLAT"));
        assert_eq!(stored[0].code.as_deref(), Some("7"));
        assert_eq!(stored[0].reference.as_deref(), Some("FEB"));
        assert_eq!(stored[0].amount, Money::from_cents(-50000));
    }

    #[tokio::test]
    async fn reimport_keeps_category() {
        let pool = create_memory_db().await.unwrap();
        let tx = row("COFFEE", -450, date(2024, 2, 1)).into_transaction();
        upsert_transaction(&pool, &tx).await.unwrap();
        update_category(&pool, &tx.id, &CategoryId::new("coffee")).await.unwrap();

        upsert_transaction(&pool, &tx).await.unwrap();
        assert_eq!(all(&pool).await[0].category, Some(CategoryId::new("coffee")));
    }

    #[tokio::test]
    async fn categorized_and_uncategorized_queries() {
        let pool = create_memory_db().await.unwrap();
        let later = categorized(row("B", -100, date(2024, 3, 2)), "food");
        let earlier = categorized(row("A", -100, date(2024, 3, 1)), "misc");
        let pending = row("C", -100, date(2024, 2, 28)).into_transaction();
        for tx in [&later, &earlier, &pending] {
            upsert_transaction(&pool, tx).await.unwrap();
        }

        let ids = |txs: Vec<Transaction>| txs.into_iter().map(|t| t.description).collect::<Vec<_>>();
        let misc = CategoryId::new("misc");

        assert_eq!(ids(get_categorized(&pool, None).await.unwrap()), vec!["A", "B"]);
        assert_eq!(ids(get_categorized(&pool, Some(&misc)).await.unwrap()), vec!["B"]);
        assert_eq!(ids(get_uncategorized(&pool, None).await.unwrap()), vec!["C"]);
        assert_eq!(ids(get_uncategorized(&pool, Some(&misc)).await.unwrap()), vec!["C", "A"]);
    }

    #[tokio::test]
    async fn update_category_reports_missing_rows() {
        let pool = create_memory_db().await.unwrap();
        let tx = row("X", -1, date(2024, 1, 1)).into_transaction();
        upsert_transaction(&pool, &tx).await.unwrap();
        let food = CategoryId::new("food");
        assert!(update_category(&pool, &tx.id, &food).await.unwrap());
        assert!(!update_category(&pool, &TransactionId("nope".into()), &food).await.unwrap());
    }

    #[tokio::test]
    async fn usage_and_accounts() {
        let pool = create_memory_db().await.unwrap();
        upsert_transaction(&pool, &categorized(row("A", -1, date(2024, 1, 1)), "food")).await.unwrap();
        upsert_transaction(&pool, &categorized(row("B", -2, date(2024, 1, 1)), "food")).await.unwrap();
        upsert_transaction(&pool, &categorized(row("C", -3, date(2024, 1, 1)), "rent")).await.unwrap();
        let mut savings = row("D", 4, date(2024, 1, 1));
        savings.account = "Savings".into();
        upsert_transaction(&pool, &savings.into_transaction()).await.unwrap();

        let usage = category_usage(&pool).await.unwrap();
        assert_eq!(usage.get(&CategoryId::new("food")), Some(&2));
        assert_eq!(usage.get(&CategoryId::new("rent")), Some(&1));
        assert_eq!(usage.len(), 2);

        assert_eq!(list_accounts(&pool).await.unwrap(), vec!["Everyday", "Savings"]);
    }

    #[tokio::test]
    async fn top_transactions_by_magnitude_in_window() {
        let pool = create_memory_db().await.unwrap();
        for (desc, cents, day, cat) in [
            ("small", -100, 1, "food"),
            ("refund", 9000, 2, "food"),
            ("big", -5000, 3, "food"),
            ("outside", -99999, 20, "food"),
            ("other", -70000, 2, "rent"),
        ] {
            upsert_transaction(&pool, &categorized(row(desc, cents, date(2024, 1, day)), cat))
                .await
                .unwrap();
        }
        let window = DateWindow::new(Some(date(2024, 1, 1)), Some(date(2024, 1, 10)));
        let top = top_transactions(&pool, &[CategoryId::new("food")], &window, 2)
            .await
            .unwrap();
        let names: Vec<_> = top.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["refund", "big"]);

        assert!(top_transactions(&pool, &[], &window, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_database_persists_between_pools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finances.db");
        let tx = row("PERSIST", -1, date(2024, 1, 1)).into_transaction();
        {
            let pool = create_db(&path).await.unwrap();
            upsert_transaction(&pool, &tx).await.unwrap();
            pool.close().await;
        }
        let pool = create_db(&path).await.unwrap();
        assert_eq!(get_uncategorized(&pool, None).await.unwrap(), vec![tx]);
    }
}

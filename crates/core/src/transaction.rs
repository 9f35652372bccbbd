use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::category::CategoryId;
use super::money::Money;

/// Content-derived transaction identity.
///
/// Version 1 of the identity contract hashes
/// `{description}|{amount}|{date}|{balance}|{account}` with SHA-256, where
/// amounts are plain two-decimal strings and the date is `YYYY-MM-DD`.
/// Changing the field order or separator changes every id and breaks
/// idempotent re-import.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn derive(
        description: &str,
        amount: Money,
        date: NaiveDate,
        balance: Money,
        account: &str,
    ) -> Self {
        let content = format!(
            "{}|{}|{}|{}|{}",
            description,
            amount.to_plain_string(),
            date.format("%Y-%m-%d"),
            balance.to_plain_string(),
            account
        );
        TransactionId(to_hex(&Sha256::digest(content.as_bytes()).into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub description: String,
    pub particulars: Option<String>,
    pub code: Option<String>,
    pub reference: Option<String>,
    pub amount: Money,
    pub date: NaiveDate,
    pub balance: Money,
    pub account: String,
    pub category: Option<CategoryId>,
}

/// Statement fields before an identity has been derived.
#[derive(Debug, Clone, Default)]
pub struct NewTransaction {
    pub description: String,
    pub particulars: Option<String>,
    pub code: Option<String>,
    pub reference: Option<String>,
    pub amount: Money,
    pub date: NaiveDate,
    pub balance: Money,
    pub account: String,
}

impl NewTransaction {
    /// Derives the id and normalises blank structured fields to `None`.
    pub fn into_transaction(self) -> Transaction {
        let id = TransactionId::derive(
            &self.description,
            self.amount,
            self.date,
            self.balance,
            &self.account,
        );
        Transaction {
            id,
            description: self.description,
            particulars: non_blank(self.particulars),
            code: non_blank(self.code),
            reference: non_blank(self.reference),
            amount: self.amount,
            date: self.date,
            balance: self.balance,
            account: self.account,
            category: None,
        }
    }
}

pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Transaction {
    pub fn has_any_structured_field(&self) -> bool {
        self.particulars.is_some() || self.code.is_some() || self.reference.is_some()
    }

    /// All three structured fields, when every one of them is present.
    pub fn structured_fields(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.particulars.as_deref()?,
            self.code.as_deref()?,
            self.reference.as_deref()?,
        ))
    }
}

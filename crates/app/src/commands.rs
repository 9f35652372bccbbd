use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tally_core::{
    render_overall, render_summary, summarize, Catalog, Category, CategoryChooser, CategoryId,
    ChooseError, DateWindow,
};
use tally_import::{parse_statement, MatchEngine, MatchOutcome, StatementLayout};
use tally_storage::{DbPool, UpsertOutcome};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub files: usize,
    pub processed: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// CSV exports in `dir`, in file-name order.
pub fn statement_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Statements directory not found: {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Loads every statement file into the store. `account_for` is asked for an
/// account name per file, given the accounts already known.
pub async fn import_statements<F>(
    pool: &DbPool,
    dir: &Path,
    layout: &StatementLayout,
    mut account_for: F,
) -> Result<ImportReport>
where
    F: FnMut(&str, &[String]) -> Result<String, ChooseError>,
{
    let files = statement_files(dir)?;
    let mut report = ImportReport::default();

    for path in files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let existing = tally_storage::list_accounts(pool).await?;
        let account = account_for(&file_name, &existing)?;

        let file = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let transactions = parse_statement(file, layout, &account)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let (mut inserted, mut updated) = (0, 0);
        for tx in &transactions {
            match tally_storage::upsert_transaction(pool, tx).await? {
                UpsertOutcome::Inserted => inserted += 1,
                UpsertOutcome::Updated => updated += 1,
            }
        }
        tracing::info!(file = %file_name, account = %account, inserted, updated, "statement imported");

        report.files += 1;
        report.processed += transactions.len();
        report.inserted += inserted;
        report.updated += updated;
    }

    Ok(report)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CategoriseReport {
    pub automatic: usize,
    pub manual: usize,
}

/// Assigns a category to every pending transaction, committing each decision
/// as it is made. A chooser error stops the run; earlier decisions stay saved.
pub async fn categorise_pending<C: CategoryChooser>(
    pool: &DbPool,
    tree: &Category,
    engine: &MatchEngine,
    chooser: &mut C,
    category_override: Option<&CategoryId>,
) -> Result<CategoriseReport> {
    let usage = tally_storage::category_usage(pool).await?;
    let catalog = Catalog::from_tree(tree).rank_by_usage(&usage);
    let pending = tally_storage::get_uncategorized(pool, category_override).await?;
    let mut corpus = tally_storage::get_categorized(pool, category_override).await?;
    tracing::info!(pending = pending.len(), corpus = corpus.len(), "categorising");

    let mut report = CategoriseReport::default();
    for mut tx in pending {
        let outcome = engine.categorise(&tx, &corpus, category_override);
        let suggested = outcome.category().and_then(|id| {
            let entry = catalog.get(id);
            if entry.is_none() {
                tracing::warn!(category = %id, transaction = %tx.id, "matched category is not defined");
            }
            entry
        });

        let entry = match suggested {
            Some(entry) => {
                let how = match outcome {
                    MatchOutcome::Reference { .. } => "reference",
                    _ => "description",
                };
                tracing::info!(transaction = %tx.id, category = %entry.id, how, "matched");
                report.automatic += 1;
                entry.clone()
            }
            None => {
                let current = tx.category.as_ref().and_then(|id| catalog.get(id));
                let chosen = chooser
                    .choose(&tx, current, &catalog)
                    .with_context(|| format!("No category chosen for '{}'", tx.description))?;
                report.manual += 1;
                chosen
            }
        };

        tally_storage::update_category(pool, &tx.id, &entry.id).await?;
        println!("Categorized: '{}' as '{}'\n", tx.description, entry.description);

        tx.category = Some(entry.id.clone());
        if Some(&entry.id) != category_override {
            corpus.push(tx);
        }
    }

    tracing::info!(automatic = report.automatic, manual = report.manual, "categorisation finished");
    Ok(report)
}

/// Renders the category tree totals, the overall total and rates, and
/// optionally the largest transactions in the visible part of the subtree.
pub async fn summary_report(
    pool: &DbPool,
    tree: &Category,
    window: &DateWindow,
    root: Option<&CategoryId>,
    top: Option<u32>,
) -> Result<String> {
    let subtree = match root {
        Some(id) => tree
            .find(id)
            .with_context(|| format!("Unknown category: {id}"))?,
        None => tree,
    };
    let transactions = tally_storage::get_categorized(pool, None).await?;
    let summary = summarize(subtree, &transactions, window);

    let mut out = render_summary(&summary);
    out.push_str(&render_overall(&summary, window));

    if let Some(limit) = top {
        let largest =
            tally_storage::top_transactions(pool, &subtree.visible_ids(), window, limit).await?;
        out.push_str(&format!("\nTop {limit} transactions for {}:\n", subtree.description));
        if largest.is_empty() {
            out.push_str("  (none)\n");
        }
        for tx in largest {
            out.push_str(&format!(
                "  {}  {:<40}  {:>12}  {:<12}  {}\n",
                tx.date,
                tx.description,
                tx.amount.to_string(),
                tx.account,
                tx.id
            ));
        }
    }

    Ok(out)
}

use std::collections::HashMap;

use super::category::{Category, CategoryId};
use super::money::Money;
use super::period::DateWindow;
use super::transaction::Transaction;

/// A category node annotated with the amounts booked against it.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub id: CategoryId,
    pub description: String,
    pub hidden: bool,
    /// Transactions tagged with exactly this category.
    pub own_total: Money,
    /// `own_total` plus the totals of visible children.
    pub total: Money,
    pub children: Vec<CategorySummary>,
}

impl CategorySummary {
    pub fn find(&self, id: &CategoryId) -> Option<&CategorySummary> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

pub fn summarize(
    tree: &Category,
    transactions: &[Transaction],
    window: &DateWindow,
) -> CategorySummary {
    let mut own: HashMap<&CategoryId, Money> = HashMap::new();
    for tx in transactions.iter().filter(|tx| window.contains(tx.date)) {
        if let Some(category) = &tx.category {
            let slot = own.entry(category).or_default();
            *slot = *slot + tx.amount;
        }
    }
    summarize_node(tree, &own)
}

fn summarize_node(node: &Category, own: &HashMap<&CategoryId, Money>) -> CategorySummary {
    let own_total = own.get(&node.id).copied().unwrap_or_default();
    let children: Vec<CategorySummary> = node
        .children
        .iter()
        .map(|child| summarize_node(child, own))
        .collect();
    let total = own_total
        + children
            .iter()
            .filter(|child| !child.hidden)
            .map(|child| child.total)
            .sum::<Money>();

    CategorySummary {
        id: node.id.clone(),
        description: node.description.clone(),
        hidden: node.hidden,
        own_total,
        total,
        children,
    }
}

/// Indented tree of non-zero, visible totals shown as magnitudes.
pub fn render_summary(summary: &CategorySummary) -> String {
    let mut out = String::new();
    render_node(summary, 0, &mut out);
    out
}

fn render_node(node: &CategorySummary, depth: usize, out: &mut String) {
    if node.hidden || node.total.is_zero() {
        return;
    }
    if depth > 0 {
        out.push_str(&" ".repeat((depth - 1) * 4));
        out.push_str("└── ");
    }
    out.push_str(&format!("{}: {}\n", node.description, node.total.abs()));
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}

/// `Total:` line plus weekly and monthly rates when the window allows them.
pub fn render_overall(summary: &CategorySummary, window: &DateWindow) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total: {}\n", summary.total));

    let (Some(from), Some(to)) = (window.from, window.to) else {
        return out;
    };
    let rates = window.rates(summary.total);
    if let Some(weekly) = rates.weekly {
        out.push_str(&format!(
            "Per week: {} (from {from} to {to}, {:.2} weeks)\n",
            weekly.per_unit, weekly.units
        ));
    }
    if let Some(monthly) = rates.monthly {
        out.push_str(&format!(
            "Per month: {} (from {from} to {to}, {:.2} months)\n",
            monthly.per_unit, monthly.units
        ));
    }
    out
}

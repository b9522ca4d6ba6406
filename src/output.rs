//! Output formatting and styling module.
//!
//! Everything the command-line front end prints goes through
//! [`OutputFormatter`], so the sorting core itself never writes to the
//! terminal.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::rule::FolderRule;
use crate::sorter::{PlannedMove, SortSummary};

/// Renders all command-line output with consistent styling.
///
/// Provides:
/// - Success, error and warning messages
/// - Section headers
/// - The numbered rule list
/// - Progress bars and summary tables for sorts
/// - Dry-run plans
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use file_sorter::output::OutputFormatter;
    /// OutputFormatter::success("Added Images  [ .jpg, .png ]");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use file_sorter::output::OutputFormatter;
    /// OutputFormatter::error("Some files could not be moved");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use file_sorter::output::OutputFormatter;
    /// OutputFormatter::warning("No folder rules configured");
    /// ```
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints a bold section header preceded by a blank line.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for a batch of `total` files.
    ///
    /// The length can be adjusted later with `set_length` when the batch
    /// size is only known once sorting starts.
    ///
    /// # Arguments
    ///
    /// * `total` - Number of files expected
    ///
    /// # Example
    ///
    /// ```no_run
    /// use file_sorter::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb
    }

    /// Prints the configured rules as a numbered list.
    ///
    /// Numbers are 1-based positions and only valid until the next change.
    ///
    /// # Arguments
    ///
    /// * `rules` - Rules in match order
    ///
    /// # Example
    ///
    /// ```no_run
    /// use file_sorter::RuleStore;
    /// use file_sorter::output::OutputFormatter;
    ///
    /// let store = RuleStore::open("/tmp/folder_rules.json");
    /// OutputFormatter::rule_list(store.rules());
    /// ```
    pub fn rule_list(rules: &[FolderRule]) {
        if rules.is_empty() {
            Self::warning("No folder rules configured. Add one with 'file-sorter add <folder>'.");
            return;
        }

        Self::header("FOLDER RULES");
        let width = rules.len().to_string().len();
        for (index, rule) in rules.iter().enumerate() {
            println!(
                "{:>width$}. {}",
                index + 1,
                rule.label().bold(),
                width = width
            );
            println!(
                "{:>width$}  {}",
                "",
                rule.path.display().to_string().dimmed(),
                width = width
            );
        }
    }

    /// Prints the end-of-batch summary as a table with a total row.
    ///
    /// # Arguments
    ///
    /// * `summary` - Counts of moved, skipped and errored files
    ///
    /// # Example
    ///
    /// ```no_run
    /// use file_sorter::SortSummary;
    /// use file_sorter::output::OutputFormatter;
    ///
    /// let summary = SortSummary { moved: 2, skipped: 1, errored: 0 };
    /// OutputFormatter::summary_table(&summary);
    /// ```
    pub fn summary_table(summary: &SortSummary) {
        Self::header("SUMMARY");

        let rows = [
            ("Sorted", summary.moved.to_string().green()),
            ("No extension matched", summary.skipped.to_string().yellow()),
            ("Errors", summary.errored.to_string().red()),
        ];
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

        for (label, count) in rows {
            println!("{:<width$} | {}", label, count, width = width);
        }
        println!("{}", "-".repeat(width + 8));
        println!(
            "{:<width$} | {}",
            "Total".bold(),
            summary.total().to_string().bold(),
            width = width
        );
    }

    /// Prints the moves a sort would perform, followed by a dry-run notice.
    ///
    /// # Arguments
    ///
    /// * `plan` - Planned moves, in processing order
    pub fn plan(plan: &[PlannedMove]) {
        if plan.is_empty() {
            Self::dry_run_notice("No files found to sort.");
            return;
        }

        for planned in plan {
            match (&planned.rule, &planned.destination) {
                (Some(rule), Some(destination)) => println!(
                    " - {}\n   → {} ({})",
                    planned.source.display(),
                    destination.display(),
                    rule
                ),
                _ => println!(
                    " - {}\n   {}",
                    planned.source.display(),
                    "no extension matched".dimmed()
                ),
            }
        }

        let matched = plan.iter().filter(|p| p.destination.is_some()).count();
        Self::dry_run_notice(&format!(
            "{} of {} files would be moved. No files were modified.",
            matched,
            plan.len()
        ));
    }

    /// Prints a dry-run notice message in yellow.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

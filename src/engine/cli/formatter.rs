//! CLI Output Formatting Module
//! Colorized terminal rendering of the metrics reports

use colored::{ColoredString, Colorize};

use crate::engine::adapter::ProfilingStatus;
use crate::engine::observability::{
    CollectionLatency, DatabaseStats, HealthStatus, HealthSummary, LatencyStatus,
    MissingIndexReport, Priority, SlowQueryReport,
};

pub struct CliFormatter;

impl CliFormatter {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue().bold(), message);
    }

    /// Print a section header
    pub fn header(title: &str) {
        println!("\n{}", title.bright_cyan().bold());
        println!("{}", "─".repeat(title.chars().count()).bright_black());
    }

    /// Print a key-value pair
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", key.bright_white().bold(), value);
    }

    /// Print a list item
    pub fn item(text: &str) {
        println!("  {} {}", "•".bright_black(), text);
    }

    /// Print a numbered item
    pub fn numbered_item(num: usize, text: &str) {
        println!("  {}. {}", num.to_string().bright_white().bold(), text);
    }

    /// Print a table header
    pub fn table_header(columns: &[&str]) {
        let plain = columns.join(" │ ");
        let header = columns
            .iter()
            .map(|c| c.bright_white().bold().to_string())
            .collect::<Vec<_>>()
            .join(" │ ");
        println!("  {}", header);
        println!("  {}", "─".repeat(plain.chars().count()).bright_black());
    }

    /// Print a table row
    pub fn table_row(values: &[&str]) {
        println!("  {}", values.join(" │ "));
    }

    /// Print an empty line
    pub fn blank() {
        println!();
    }

    pub fn health_summary(summary: &HealthSummary) {
        Self::header("MongoDB Health");
        Self::kv(
            "Score",
            &format!("{}/100 ({})", summary.health_score, paint_status(summary.status)),
        );
        Self::kv("Taken", &summary.timestamp.to_rfc3339());

        if let Some(stats) = &summary.db_stats {
            Self::kv(
                "Database",
                &format!(
                    "{} on {} (MongoDB {})",
                    stats.database.name, stats.server.host, stats.server.version
                ),
            );
            Self::kv("Uptime", &stats.uptime.formatted);
        }
        Self::kv("Slow queries", &summary.slow_queries.len().to_string());
        Self::kv("Collections missing indexes", &summary.missing_indexes.len().to_string());
        Self::kv(
            "Slow collections",
            &summary
                .collection_latency
                .iter()
                .filter(|c| c.status == LatencyStatus::Slow)
                .count()
                .to_string(),
        );

        Self::header("Recommendations");
        for (i, rec) in summary.recommendations.iter().enumerate() {
            Self::numbered_item(i + 1, rec);
        }

        if !summary.unavailable.is_empty() {
            Self::blank();
            for failure in &summary.unavailable {
                Self::warning(&format!("{:?} unavailable: {}", failure.facet, failure.error));
            }
        }
    }

    pub fn database_stats(stats: &DatabaseStats) {
        let db = &stats.database;
        Self::header(&format!("Database: {}", db.name));
        Self::kv("Collections", &db.collections.to_string());
        Self::kv("Views", &db.views.to_string());
        Self::kv("Objects", &db.objects.to_string());
        Self::kv("Avg object size", &db.avg_obj_size.formatted);
        Self::kv("Data size", &db.data_size.formatted);
        Self::kv("Storage size", &db.storage_size.formatted);
        Self::kv("Indexes", &format!("{} ({})", db.indexes, db.index_size.formatted));
        Self::kv("Total size", &db.total_size.formatted);

        Self::header("Server");
        Self::kv("Host", &stats.server.host);
        Self::kv("Version", &stats.server.version);
        Self::kv("Uptime", &stats.uptime.formatted);
        Self::kv(
            "Memory",
            &format!(
                "{} MB resident, {} MB virtual",
                stats.memory.resident_mb, stats.memory.virtual_mb
            ),
        );
        Self::kv(
            "Connections",
            &format!(
                "{} current, {} available, {} created",
                stats.connections.current,
                stats.connections.available,
                stats.connections.total_created
            ),
        );

        let ops = &stats.operations;
        Self::header("Operation counters");
        Self::table_header(&["insert", "query", "update", "delete", "getmore", "command"]);
        let values = [ops.insert, ops.query, ops.update, ops.delete, ops.getmore, ops.command]
            .map(|v| v.to_string());
        Self::table_row(&values.iter().map(String::as_str).collect::<Vec<_>>());
    }

    pub fn slow_queries(report: &SlowQueryReport) {
        Self::header(&format!("Slow queries (> {}ms)", report.threshold_ms));
        Self::kv("Profiling", &report.profiling_level.to_string());

        if report.queries.is_empty() {
            Self::item("(none)");
            return;
        }

        for query in &report.queries {
            let when = query
                .timestamp
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            Self::item(&format!(
                "{} {} {} {} {}",
                when.bright_black(),
                format!("{}ms", query.duration_ms).red().bold(),
                query.operation,
                query.namespace,
                query.plan_summary.as_deref().unwrap_or(""),
            ));
        }
    }

    pub fn missing_indexes(reports: &[MissingIndexReport]) {
        Self::header("Missing indexes");
        if reports.is_empty() {
            Self::success("No collection needs additional indexes");
            return;
        }

        for report in reports {
            println!(
                "\n  {} ({} documents; indexes: {})",
                report.collection.bright_white().bold(),
                report.document_count,
                report.existing_indexes.join(", ")
            );
            for rec in &report.recommendations {
                println!(
                    "    {} {} {}",
                    paint_priority(rec.priority),
                    rec.suggested_index.bright_white(),
                    rec.reason.bright_black()
                );
            }
        }
    }

    pub fn collection_latency(samples: &[CollectionLatency]) {
        Self::header("Collection latency");
        if samples.is_empty() {
            Self::item("(no collections)");
            return;
        }

        Self::table_header(&["latency", "status", "collection"]);
        for sample in samples {
            let latency = format!("{:>5}ms", sample.latency_ms);
            let status = paint_latency(sample.status).to_string();
            Self::table_row(&[latency.as_str(), status.as_str(), sample.collection.as_str()]);
        }
    }

    pub fn profiling_status(status: &ProfilingStatus) {
        Self::header("Profiler");
        Self::kv("Level", &status.level.to_string());
        Self::kv("Slow threshold", &format!("{}ms", status.slow_ms));
    }
}

fn paint_status(status: HealthStatus) -> ColoredString {
    match status {
        HealthStatus::Excellent => status.as_str().green().bold(),
        HealthStatus::Good => status.as_str().green(),
        HealthStatus::Warning => status.as_str().yellow().bold(),
        HealthStatus::Critical => status.as_str().red().bold(),
    }
}

fn paint_priority(priority: Priority) -> ColoredString {
    match priority {
        Priority::High => "[high]  ".red().bold(),
        Priority::Medium => "[medium]".yellow(),
        Priority::Low => "[low]   ".bright_black(),
    }
}

fn paint_latency(status: LatencyStatus) -> ColoredString {
    match status {
        LatencyStatus::Good => "good   ".green(),
        LatencyStatus::Warning => "warning".yellow(),
        LatencyStatus::Slow => "slow   ".red().bold(),
    }
}

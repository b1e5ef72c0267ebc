//! Plain and pretty rendering of the results shown on the command line
//!
//! Every function returns the text to print, so the binary stays the only
//! place writing to stdout.

use chrono::{DateTime, Utc};

use crate::{RemovalSummary, RepositoryRef, SearchPage, TagDetails, TagRecord};

/// Sizes are reported in (decimal) megabytes, rounded down
pub fn size_mb(bytes: u64) -> String {
    format!("{} MB", bytes / 1_000_000)
}

fn date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Tag names joined with `delim`, in listing order
pub fn tags_plain(tags: &[TagRecord], delim: &str) -> String {
    tags.iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(delim)
}

/// A numbered table of tags with their size and last update date
pub fn tags_pretty(repo: &RepositoryRef, tags: &[TagRecord]) -> String {
    let names: Vec<String> = tags.iter().map(|t| repo.tagged(&t.name)).collect();
    let width = names.iter().map(String::len).max().unwrap_or(0).max(3);

    let header = format!(
        "{:<5}{:^width$} | {:^11} | {:^10}",
        "NUM", "TAG", "SIZE", "UPDATED AT"
    );
    let mut out = format!("{header}\n{}\n", "-".repeat(header.len()));

    for (index, (tag, name)) in tags.iter().zip(&names).enumerate() {
        let num = format!("{}.", index + 1);
        out.push_str(&format!(
            "{:<5}{:<width$} | {:>11} | {:^10}\n",
            num,
            name,
            size_mb(tag.size_bytes),
            date(tag.last_updated)
        ));
    }

    out
}

/// Renders one page of search results as `name : description` lines
///
/// The pretty variant adds a page header and the star count of each repository.
pub fn search_page(page_number: u32, page: &SearchPage, pretty: bool) -> String {
    let width = page
        .results
        .iter()
        .map(|r| r.repo_name.len())
        .max()
        .unwrap_or(0)
        + 1;

    let mut out = String::new();
    if pretty {
        let title = format!("Page {page_number}");
        out.push_str(&format!("{title}\n{}\n", "-".repeat(title.len())));
    }

    for result in &page.results {
        let description = result
            .short_description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("-");

        if pretty {
            let official = if result.is_official { "[OK]" } else { "" };
            out.push_str(&format!(
                "{:<width$} {:>8} {:<4} : {}\n",
                result.repo_name, result.star_count, official, description
            ));
        } else {
            out.push_str(&format!("{:<width$} : {}\n", result.repo_name, description));
        }
    }

    out
}

/// Every attribute of a tag, one `key: value` line each
pub fn tag_details(repo: &RepositoryRef, tag: &TagDetails) -> String {
    let optional = |value: Option<&str>| value.unwrap_or("-").to_string();

    let mut rows = vec![
        ("namespace", repo.resolved_namespace().to_string()),
        ("repository_name", repo.name().to_string()),
        ("name", tag.name.clone()),
        ("size_mb", size_mb(tag.full_size)),
        ("id", tag.id.to_string()),
        ("digest", optional(tag.digest.as_deref())),
        ("media_type", optional(tag.media_type.as_deref())),
        ("tag_status", optional(tag.tag_status.as_deref())),
        ("last_updated", date(tag.last_updated)),
        ("last_updater", optional(tag.last_updater_username.as_deref())),
        ("last_pushed", date(tag.tag_last_pushed)),
        ("last_pulled", date(tag.tag_last_pulled)),
    ];

    let platforms: Vec<String> = tag
        .images
        .iter()
        .map(|image| {
            let os = image.os.as_deref().unwrap_or("unknown");
            match &image.variant {
                Some(variant) => format!("{os}/{}/{variant}", image.architecture),
                None => format!("{os}/{}", image.architecture),
            }
        })
        .collect();
    if !platforms.is_empty() {
        rows.push(("platforms", platforms.join(", ")));
    }

    let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0) + 1;
    rows.iter()
        .map(|(key, value)| format!("  {key:<width$}:  {value}\n"))
        .collect()
}

/// The confirmation message listing every tag about to be deleted
pub fn removal_plan(repo: &RepositoryRef, targets: &[String]) -> String {
    let mut out = String::from("The following tags will be deleted:\n");
    for tag in targets {
        out.push_str(&format!("\t{}\n", repo.tagged(tag)));
    }
    out
}

/// Reports a removal batch, listing failed and skipped tags so they can be retried
pub fn removal_report(repo: &RepositoryRef, summary: &RemovalSummary, pretty: bool) -> String {
    let mut lines = Vec::new();

    for outcome in &summary.outcomes {
        match (outcome.error_kind(), outcome.error_detail()) {
            (Some(kind), Some(detail)) => lines.push(format!(
                "failed   {}  {kind}: {detail}",
                repo.tagged(&outcome.tag)
            )),
            _ if pretty => lines.push(format!("removed  {}", repo.tagged(&outcome.tag))),
            _ => {}
        }
    }
    for tag in &summary.skipped {
        lines.push(format!("skipped  {}", repo.tagged(tag)));
    }

    let mut total = format!(
        "Removed {} of {} tags",
        summary.succeeded(),
        summary.attempted() + summary.skipped.len()
    );
    let failed = summary.attempted() - summary.succeeded();
    if failed > 0 {
        total.push_str(&format!(", {failed} failed"));
    }
    if !summary.skipped.is_empty() {
        total.push_str(&format!(", {} skipped", summary.skipped.len()));
    }
    lines.push(total);

    lines.iter().map(|line| format!("{line}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HubError, RemovalOutcome, RepositorySummary};

    fn record(name: &str, size_bytes: u64, updated: &str) -> TagRecord {
        TagRecord {
            name: name.to_string(),
            last_updated: Some(updated.parse().unwrap()),
            size_bytes,
            digest: None,
        }
    }

    #[test]
    fn test_size_mb() {
        assert_eq!(size_mb(755_930_694), "755 MB");
        assert_eq!(size_mb(999_999), "0 MB");
    }

    #[test]
    fn test_tags_plain() {
        let tags = [
            record("v2", 1, "2024-02-01T00:00:00Z"),
            record("v1", 1, "2024-01-01T00:00:00Z"),
        ];
        assert_eq!(tags_plain(&tags, " "), "v2 v1");
        assert_eq!(tags_plain(&tags, "\n"), "v2\nv1");
        assert_eq!(tags_plain(&[], ","), "");
    }

    #[test]
    fn test_tags_pretty() {
        let repo: RepositoryRef = "acme/app".parse().unwrap();
        let tags = [
            record("v2", 52_000_000, "2024-02-01T10:00:00Z"),
            record("v1", 3_000_000, "2024-01-01T10:00:00Z"),
        ];

        let table = tags_pretty(&repo, &tags);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("NUM"));
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(lines[2].starts_with("1.   acme/app:v2"));
        assert!(lines[2].contains("52 MB"));
        assert!(lines[2].contains("2024-02-01"));
        assert!(lines[3].starts_with("2.   acme/app:v1"));
    }

    #[test]
    fn test_search_page() {
        let page = SearchPage {
            count: 2,
            has_next: false,
            results: vec![
                RepositorySummary {
                    repo_name: "nginx".into(),
                    short_description: Some("Official build of Nginx.".into()),
                    star_count: 20000,
                    pull_count: 0,
                    repo_owner: None,
                    is_official: true,
                    is_automated: false,
                },
                RepositorySummary {
                    repo_name: "bitnami/nginx".into(),
                    short_description: None,
                    star_count: 10,
                    pull_count: 0,
                    repo_owner: None,
                    is_official: false,
                    is_automated: false,
                },
            ],
        };

        let plain = search_page(1, &page, false);
        assert_eq!(
            plain,
            "nginx          : Official build of Nginx.\nbitnami/nginx  : -\n"
        );

        let pretty = search_page(2, &page, true);
        assert!(pretty.starts_with("Page 2\n------\n"));
        assert!(pretty.contains("[OK]"));
    }

    #[test]
    fn test_removal_plan() {
        let repo: RepositoryRef = "nginx".parse().unwrap();
        let plan = removal_plan(&repo, &["old".into(), "older".into()]);
        assert_eq!(
            plan,
            "The following tags will be deleted:\n\tnginx:old\n\tnginx:older\n"
        );
    }

    #[test]
    fn test_removal_report_lists_failures() {
        let repo: RepositoryRef = "acme/app".parse().unwrap();
        let summary = RemovalSummary {
            outcomes: vec![
                RemovalOutcome {
                    tag: "v3".into(),
                    error: None,
                },
                RemovalOutcome {
                    tag: "v2".into(),
                    error: Some(HubError::NotFound("tag `acme/app:v2`".into())),
                },
            ],
            skipped: vec!["v1".into()],
        };

        let report = removal_report(&repo, &summary, false);
        assert_eq!(
            report,
            "failed   acme/app:v2  NotFoundError: tag `acme/app:v2`\n\
             skipped  acme/app:v1\n\
             Removed 1 of 3 tags, 1 failed, 1 skipped\n"
        );

        let pretty = removal_report(&repo, &summary, true);
        assert!(pretty.starts_with("removed  acme/app:v3\n"));
    }

    #[test]
    fn test_removal_report_success() {
        let repo: RepositoryRef = "acme/app".parse().unwrap();
        let summary = RemovalSummary::default();
        assert_eq!(removal_report(&repo, &summary, false), "Removed 0 of 0 tags\n");
    }
}

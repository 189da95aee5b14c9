use std::sync::Arc;
use std::time::Duration;

use colored::*;
use tokio_util::sync::CancellationToken;

use originr_common::config::{ScanConfig, UserAgent, WafOptions};
use originr_common::network::range::Ipv4Range;
use originr_common::network::target;
use originr_common::{info, success, warn};
use originr_core::models::{IpResult, ProbeStatus, ScanReport};
use originr_core::Scanner;

use crate::commands::ScanArgs;
use crate::terminal::print;
use crate::terminal::progress::ScanProgress;

pub async fn run(args: ScanArgs, quiet: bool) -> anyhow::Result<()> {
    let cfg = build_config(args);
    let total: u64 = cfg.ranges.iter().map(Ipv4Range::addr_count).sum();
    let domain = cfg.domain.clone();

    info!("Probing {total} candidate addresses for {domain}");

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        warn!("interrupt received, stopping the scan");
        signal_cancel.cancel();
    });

    let mut scanner = Scanner::new(cfg)?;

    let progress = if quiet {
        None
    } else {
        Some(Arc::new(ScanProgress::new(total)))
    };
    if let Some(bar) = &progress {
        let ticks = bar.clone();
        scanner = scanner.on_progress(Arc::new(move |processed: u64, _total: u64| {
            ticks.update(processed)
        }));

        let hits = bar.clone();
        scanner = scanner.on_result(Arc::new(move |result: &IpResult| {
            if result.status == ProbeStatus::Success {
                hits.println(&live_hit_line(result));
            }
        }));
    }

    let report = scanner.scan(cancel).await?;

    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }

    render_report(&report, quiet);
    Ok(())
}

fn build_config(args: ScanArgs) -> ScanConfig {
    let mut ranges = Vec::new();
    for parsed in &args.range {
        ranges.extend(target::to_ranges(parsed));
    }

    let user_agent = if args.random_agent {
        UserAgent::Random
    } else if let Some(value) = args.user_agent {
        UserAgent::Fixed(value)
    } else {
        UserAgent::default()
    };

    ScanConfig {
        domain: args.domain,
        method: args.method,
        timeout: Duration::from_secs(args.timeout),
        connect_timeout: Duration::from_secs(args.connect_timeout),
        workers: args.workers,
        ranges,
        waf: WafOptions {
            skip: args.skip_waf,
            providers: (!args.waf_providers.is_empty()).then_some(args.waf_providers),
            ranges_file: args.waf_file,
            show_skipped: args.show_skipped,
        },
        max_redirects: args.max_redirects,
        verify_content: args.verify_content,
        custom_header: args.header,
        user_agent,
        proxy: args.proxy,
        show_all: args.show_all,
    }
}

fn live_hit_line(result: &IpResult) -> String {
    format!(
        "{} {} answered 200 in {}ms",
        "[+]".green().bold(),
        result.ip.to_string().bold(),
        result.response_time.as_millis()
    )
}

fn render_report(report: &ScanReport, quiet: bool) {
    let summary = &report.summary;

    print::header("scan results", quiet);

    if report.buckets.success.is_empty() {
        print::print("No candidate origins answered 200.");
    }

    for result in &report.buckets.success {
        let flagged = report.false_positives.contains(&result.ip);
        print_hit(result, flagged);
    }

    print_other_buckets(report);

    print::fat_separator();
    print::aligned_line("total addresses", summary.total_ips);
    print::aligned_line("scanned", summary.scanned);
    print::aligned_line("skipped (WAF/CDN)", summary.skipped);
    for (provider, count) in &summary.waf_skips {
        if *count > 0 {
            print::aligned_line(&format!("  {provider}"), count);
        }
    }
    print::aligned_line(
        "origin candidates",
        summary.success_count.to_string().green().bold(),
    );
    if summary.false_positive_count > 0 {
        print::aligned_line(
            "false positives",
            summary.false_positive_count.to_string().yellow().bold(),
        );
    }
    print::aligned_line("duration", format!("{:.2}s", summary.duration.as_secs_f64()));

    let genuine = summary.success_count - summary.false_positive_count;
    if genuine > 0 {
        success!("Found {genuine} candidate origin(s) worth a closer look");
    } else {
        info!("No genuine origins surfaced; zero hits is a valid outcome");
    }
}

fn print_hit(result: &IpResult, flagged: bool) {
    print::blank();

    let marker = if flagged {
        "[!]".yellow().bold()
    } else {
        "[+]".green().bold()
    };
    let mut line = format!(
        "{} {} 200 in {}ms",
        marker,
        result.ip.to_string().bold(),
        result.response_time.as_millis()
    );
    if flagged {
        line = format!("{line} {}", "(likely shared hosting)".yellow());
    }
    print::print(&line);

    if let Some(title) = &result.title {
        print::print(&format!("    title: {title}"));
    }
    if let Some(hash) = &result.body_hash {
        print::print(&format!("    body:  sha256:{}", &hash[..16.min(hash.len())]));
    }
    for hop in &result.redirect_chain {
        print::print(&format!("    {} {}", "↳".bright_black(), hop));
    }
}

fn print_other_buckets(report: &ScanReport) {
    let buckets = &report.buckets;
    let shown: [(&str, usize); 4] = [
        ("redirects", buckets.redirects.len()),
        ("client/server errors", buckets.other.len()),
        ("timeouts", buckets.timeouts.len()),
        ("transport errors", buckets.errors.len()),
    ];

    if shown.iter().all(|(_, count)| *count == 0) {
        return;
    }

    print::blank();
    for (label, count) in shown {
        if count > 0 {
            print::aligned_line(label, count);
        }
    }
}

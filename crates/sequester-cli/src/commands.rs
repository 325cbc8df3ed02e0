use std::io::{self, Write};

use anyhow::Context;
use colored::Colorize;
use sequester_engine::{RunOptions, RunReport, Sequester, SequesterConfig};
use sequester_odb::GitCli;
use tracing::debug;

use crate::cli::{Cli, OutputFormat};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let explicit = cli
        .config
        .as_deref()
        .map(SequesterConfig::load)
        .transpose()?;
    let program = explicit
        .as_ref()
        .map_or_else(|| "git".to_string(), |c| c.git.clone());

    let mut git = GitCli::with_program(program.as_str(), &cli.dir)
        .with_context(|| format!("cannot open repository at {}", cli.dir.display()))?;

    let config = match explicit {
        Some(config) => config,
        None => {
            let (config, origin) = SequesterConfig::discover(None, &git.repository().git_dir)?;
            if let Some(path) = origin {
                debug!(path = %path.display(), "loaded config");
            }
            config
        }
    };
    if config.git != program {
        git = GitCli::with_program(config.git.as_str(), &cli.dir)
            .with_context(|| format!("cannot open repository with `{}`", config.git))?;
    }

    let options = build_options(&cli, &config);
    let report = Sequester::new(&git, options)?.run()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        OutputFormat::Text => render_text(&report, &mut out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Config file values, overridden by whatever was given on the command line.
fn build_options(cli: &Cli, config: &SequesterConfig) -> RunOptions {
    let mut options = RunOptions::from_config(cli.since.clone(), config)
        .with_refs(cli.refs.clone())
        .with_dry_run(cli.dry_run);
    if let Some(cutoff) = cli.size_cutoff {
        options = options.with_size_cutoff(cutoff);
    }
    if cli.replace_objects {
        options = options.with_replace_objects(true);
    }
    if cli.no_gc {
        options = options.with_compact(false);
    }
    options
}

fn render_text(report: &RunReport, out: &mut impl Write) -> io::Result<()> {
    if report.dry_run {
        writeln!(out, "{} dry run: repository unchanged", "!".yellow().bold())?;
    }
    writeln!(
        out,
        "Scanned {} objects: {} blobs over {} bytes, {} kept refs",
        report.objects_scanned.to_string().bold(),
        report.large_blobs.to_string().bold(),
        report.size_cutoff,
        report.refs_kept.len(),
    )?;

    let count = report.sequestered.len();
    if count == 0 {
        writeln!(out, "{} No old big blobs.", "✓".green().bold())?;
    } else {
        let verb = if report.dry_run { "Would sequester" } else { "Sequestered" };
        writeln!(out, "{verb} {} old big blob(s):", count.to_string().bold())?;
        for id in report.sequestered.iter() {
            writeln!(out, "  {}", id.to_string().yellow())?;
        }
    }

    for name in &report.refs_pruned {
        writeln!(out, "  {} {}", "pruned".red(), name)?;
    }
    if let Some(redirects) = &report.redirects {
        writeln!(
            out,
            "Redirected {} blob(s) to placeholder {} ({} already redirected)",
            redirects.created,
            redirects.placeholder.short_hex().cyan(),
            redirects.skipped,
        )?;
    }
    if let Some(pack) = &report.pack {
        let state = if pack.already_present {
            "already present".dimmed().to_string()
        } else {
            "installed".green().to_string()
        };
        writeln!(out, "Archival pack {} {}", pack.location.display(), state)?;
    }
    if report.compacted {
        writeln!(out, "{} Repository compacted.", "✓".green().bold())?;
    } else if !report.dry_run {
        writeln!(out, "Compaction skipped.")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use sequester_types::ObjectId;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["git-sequester"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn config_values_apply_when_flags_absent() {
        let config = SequesterConfig {
            replace_objects: true,
            compact: false,
            pack_prefix: "attic".into(),
            ..SequesterConfig::default()
        };
        let options = build_options(&parse(&["--since", "1 year ago"]), &config);
        assert!(options.replace_objects);
        assert!(!options.compact);
        assert_eq!(options.pack_prefix, "attic");
        assert_eq!(options.refs, vec!["--all"]);
        assert_eq!(options.size_cutoff.bytes(), 1_000_000);
    }

    #[test]
    fn flags_override_config() {
        let config = SequesterConfig::default();
        let cli = parse(&[
            "--since",
            "2020-01-01",
            "--size-cutoff",
            "500k",
            "--replace-objects",
            "--no-gc",
            "--dry-run",
            "main",
        ]);
        let options = build_options(&cli, &config);
        assert_eq!(options.since, "2020-01-01");
        assert_eq!(options.size_cutoff.bytes(), 500_000);
        assert!(options.replace_objects);
        assert!(!options.compact);
        assert!(options.dry_run);
        assert_eq!(options.refs, vec!["main"]);
    }

    #[test]
    fn text_report_for_empty_run() {
        let mut buf = Vec::new();
        render_text(&sample_report(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Scanned"));
        assert!(text.contains("No old big blobs."));
        assert!(text.contains("Compaction skipped."));
    }

    #[test]
    fn text_report_for_dry_run_lists_ids() {
        let id = ObjectId::from_hex("3b18e512dba79e4c8300dd08aeb37f8e728b8dad").unwrap();
        let report = RunReport {
            dry_run: true,
            large_blobs: 1,
            sequestered: [id].into_iter().collect(),
            ..sample_report()
        };
        let mut buf = Vec::new();
        render_text(&report, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("dry run"));
        assert!(text.contains("Would sequester"));
        assert!(text.contains("3b18e512dba79e4c8300dd08aeb37f8e728b8dad"));
        assert!(!text.contains("Compaction skipped."));
    }

    fn sample_report() -> RunReport {
        RunReport {
            since: "1 year ago".into(),
            size_cutoff: Default::default(),
            replace_objects: false,
            dry_run: false,
            refs_kept: Vec::new(),
            objects_scanned: 12,
            large_blobs: 0,
            full_usage: None,
            recent_usage: Default::default(),
            sequestered: Default::default(),
            refs_pruned: Vec::new(),
            redirects: None,
            pack: None,
            compacted: false,
        }
    }
}

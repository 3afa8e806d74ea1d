mod args;
mod logging;

use anyhow::Context;
use clap::Parser;
use describe::{
    DescribeConfig, DescribeReport, Describer, MemoryPropertyStore, PropertiesFile, PropertyStore,
};

use crate::args::{Args, Emit};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _file_log_guard = logging::init_logging(&log_level);

    let mut config = match &args.config {
        Some(path) => DescribeConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DescribeConfig::default(),
    };
    args.apply_to(&mut config);

    let mut file = match &args.properties {
        Some(path) => Some(
            PropertiesFile::load(path)
                .with_context(|| format!("Failed to read properties from {}", path.display()))?,
        ),
        None => None,
    };
    let mut memory = MemoryPropertyStore::new();
    let store: &mut dyn PropertyStore = match file.as_mut() {
        Some(file) => file,
        None => &mut memory,
    };
    for (key, value) in &args.defines {
        store.set(key, value.clone());
    }

    let describer = Describer::new(config);
    let result = describer.run(store).map_err(|e| {
        let kind = e.kind();
        anyhow::Error::new(e).context(format!("{} while describing repository", kind))
    });
    let Some(report) = result? else {
        return Ok(());
    };
    tracing::debug!(?report.outcome, resolved_time = report.resolved_time, "Describe finished");

    if let Some(file) = &file {
        file.save()
            .with_context(|| format!("Failed to write properties to {}", file.path().display()))?;
        tracing::debug!("Wrote {}", file.path().display());
    }

    print!("{}", render(&report, args.emit)?);
    Ok(())
}

fn render(report: &DescribeReport, emit: Emit) -> anyhow::Result<String> {
    let pairs = [
        &report.description_assignment,
        &report.timestamp_assignment,
    ];

    let out = match emit {
        Emit::None => String::new(),
        Emit::Properties => pairs
            .iter()
            .map(|a| format!("{}={}\n", a.key, a.value))
            .collect(),
        Emit::Env => pairs
            .iter()
            .map(|a| format!("{}={}\n", env_key(&a.key), shell_quote(&a.value)))
            .collect(),
        Emit::Cargo => pairs
            .iter()
            .map(|a| format!("cargo:rustc-env={}={}\n", env_key(&a.key), a.value))
            .collect(),
        Emit::Json => format!("{}\n", serde_json::to_string_pretty(report)?),
    };
    Ok(out)
}

/// `project.build.outputTimestamp` -> `PROJECT_BUILD_OUTPUTTIMESTAMP`
fn env_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.,:/+@%".contains(c))
    {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use describe::{Assignment, OverridePolicyResult, ResolutionOutcome, ResolvedRevision};

    use super::*;

    fn report() -> DescribeReport {
        DescribeReport {
            outcome: ResolutionOutcome::Resolved(ResolvedRevision {
                revision_id: "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678".to_string(),
                abbreviated: "a1b2c3d".to_string(),
                commit_time: 1_700_000_000,
            }),
            description: "git-demo-a1b2c3d".to_string(),
            resolved_time: 1_700_000_000,
            description_assignment: Assignment {
                key: "describe".to_string(),
                result: OverridePolicyResult::WriteNew,
                value: "git-demo-a1b2c3d".to_string(),
            },
            timestamp_assignment: Assignment {
                key: "project.build.outputTimestamp".to_string(),
                result: OverridePolicyResult::SkipExisting,
                value: "1600000000".to_string(),
            },
        }
    }

    #[test]
    fn emits_stored_values() {
        assert_eq!(
            render(&report(), Emit::Properties).unwrap(),
            "describe=git-demo-a1b2c3d\nproject.build.outputTimestamp=1600000000\n"
        );
        assert_eq!(
            render(&report(), Emit::Cargo).unwrap(),
            "cargo:rustc-env=DESCRIBE=git-demo-a1b2c3d\n\
             cargo:rustc-env=PROJECT_BUILD_OUTPUTTIMESTAMP=1600000000\n"
        );
        assert_eq!(render(&report(), Emit::None).unwrap(), "");
    }

    #[test]
    fn json_report_includes_outcome() {
        let json: serde_json::Value =
            serde_json::from_str(&render(&report(), Emit::Json).unwrap()).unwrap();
        assert_eq!(json["outcome"]["status"], "resolved");
        assert_eq!(json["outcome"]["abbreviated"], "a1b2c3d");
        assert_eq!(json["timestamp_assignment"]["result"], "skip_existing");
    }

    #[test]
    fn env_values_are_quoted_when_needed() {
        assert_eq!(env_key("build.id-x"), "BUILD_ID_X");
        assert_eq!(shell_quote("git-demo-a1b2c3d"), "git-demo-a1b2c3d");
        assert_eq!(shell_quote("it's here"), r"'it'\''s here'");
        assert_eq!(shell_quote(""), "''");
    }
}

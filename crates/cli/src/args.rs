use std::path::PathBuf;

use clap::{Parser, ValueEnum, builder::BoolishValueParser};
use describe::DescribeConfig;

/// Inject a git-derived build description and commit timestamp into a
/// properties file.
#[derive(Debug, Parser)]
#[command(name = "git-describe", version)]
pub struct Args {
    /// JSON file with describe options; flags override its values
    #[arg(long, env = "DESCRIBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Template with one %s slot for the abbreviated hash
    #[arg(long, env = "DESCRIBE_FORMAT")]
    pub format: Option<String>,

    /// Property receiving the formatted description
    #[arg(long, env = "DESCRIBE_PROPERTY")]
    pub description_property: Option<String>,

    /// Property receiving the commit time in epoch seconds
    #[arg(long, env = "DESCRIBE_TIMESTAMP_PROPERTY")]
    pub timestamp_property: Option<String>,

    /// Replace property values that are already set
    #[arg(long = "override", env = "DESCRIBE_OVERRIDE", value_parser = BoolishValueParser::new())]
    pub override_existing: bool,

    /// Directory to start repository discovery from (defaults to the current directory)
    #[arg(long, env = "DESCRIBE_SCM_DIRECTORY")]
    pub scm_directory: Option<PathBuf>,

    /// Hash used when HEAD cannot be resolved
    #[arg(long, env = "DESCRIBE_FAIL_HASH")]
    pub fail_hash: Option<String>,

    /// Fail instead of falling back when the repository cannot be read
    #[arg(long, env = "DESCRIBE_FAIL", value_parser = BoolishValueParser::new())]
    pub fail: bool,

    /// Minimum length of the abbreviated hash
    #[arg(long, env = "DESCRIBE_ABBREV_LENGTH", value_parser = clap::value_parser!(u8).range(4..=40))]
    pub abbrev_length: Option<u8>,

    /// Do nothing
    #[arg(long, env = "DESCRIBE_SKIP", value_parser = BoolishValueParser::new())]
    pub skip: bool,

    /// Use SOURCE_DATE_EPOCH instead of the wall clock when HEAD has no commit time
    #[arg(long, env = "DESCRIBE_USE_SOURCE_DATE_EPOCH", value_parser = BoolishValueParser::new())]
    pub use_source_date_epoch: bool,

    /// Value for ${project.name} when the properties do not define it
    /// (defaults to the repository directory name)
    #[arg(long, env = "DESCRIBE_PROJECT_NAME")]
    pub project_name: Option<String>,

    /// Properties file read before and written after the run
    #[arg(long, short = 'p', env = "DESCRIBE_PROPERTIES")]
    pub properties: Option<PathBuf>,

    /// Pre-existing property, as key=value; may be repeated
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// How to print the resulting properties on stdout
    #[arg(long, value_enum, default_value_t = Emit::Properties)]
    pub emit: Emit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Emit {
    None,
    /// key=value lines
    Properties,
    /// KEY=value lines for a shell
    Env,
    /// cargo:rustc-env=KEY=value lines for a build script
    Cargo,
    /// The full report as JSON
    Json,
}

impl Args {
    /// Overlay the flags that were given onto `config`.
    pub fn apply_to(&self, config: &mut DescribeConfig) {
        if let Some(format) = &self.format {
            config.format = format.clone();
        }
        if let Some(key) = &self.description_property {
            config.description_property = key.clone();
        }
        if let Some(key) = &self.timestamp_property {
            config.timestamp_property = key.clone();
        }
        if let Some(dir) = &self.scm_directory {
            config.scm_directory = Some(dir.clone());
        }
        if let Some(hash) = &self.fail_hash {
            config.fail_hash = hash.clone();
        }
        if let Some(len) = self.abbrev_length {
            config.abbrev_length = usize::from(len);
        }
        if let Some(name) = &self.project_name {
            config.project_name = Some(name.clone());
        }
        config.override_existing |= self.override_existing;
        config.fail |= self.fail;
        config.skip |= self.skip;
        config.use_source_date_epoch |= self.use_source_date_epoch;

        if config.project_name.is_none() {
            config.project_name = config
                .repository_directory()
                .canonicalize()
                .ok()
                .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()));
        }
    }
}

fn parse_define(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, _)) if key.is_empty() => Err(format!("empty property name in {:?}", raw)),
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Ok((raw.to_string(), String::new())),
    }
}
